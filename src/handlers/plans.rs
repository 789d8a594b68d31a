use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{PlanQuery, PlanRequest};
use crate::error::{AppError, AppResult};
use crate::models::plan::{Plan, PlanKind, PlanSummary};
use crate::models::user::User;
use crate::services::ai_client::UserContext;
use crate::services::metrics::missing_profile_fields;
use crate::AppState;

/// Plans are personalised from the metrics, so they need a complete profile.
fn require_complete_profile(user: &User) -> AppResult<()> {
    let missing = missing_profile_fields(&user.physical_profile());
    if !missing.is_empty() || user.calculated_metrics().is_none() {
        return Err(AppError::Validation(format!(
            "Complete your profile before generating a plan, missing: {}",
            if missing.is_empty() { "metrics".to_string() } else { missing.join(", ") }
        )));
    }
    Ok(())
}

async fn store_plan(
    db: &sqlx::PgPool,
    user_id: Uuid,
    kind: PlanKind,
    days: i32,
    content: serde_json::Value,
) -> AppResult<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        r#"
        INSERT INTO plans (id, user_id, kind, days, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(kind.as_str())
    .bind(days)
    .bind(SqlJson(content))
    .fetch_one(db)
    .await?;

    tracing::info!(user_id = %user_id, plan_id = %plan.id, kind = kind.as_str(), days, "Plan stored");
    Ok(plan)
}

pub async fn generate_meal_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<PlanRequest>,
) -> AppResult<(StatusCode, Json<Plan>)> {
    body.validate()?;

    let user = User::fetch(&state.db, auth_user.id).await?;
    require_complete_profile(&user)?;

    let content = state
        .ai
        .generate_meal_plan(&UserContext::from(&user), body.days, body.include_snacks)
        .await
        .map_err(AppError::upstream)?;

    let plan = store_plan(&state.db, user.id, PlanKind::Meal, body.days, content).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn generate_workout_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<PlanRequest>,
) -> AppResult<(StatusCode, Json<Plan>)> {
    body.validate()?;

    let user = User::fetch(&state.db, auth_user.id).await?;
    require_complete_profile(&user)?;

    let content = state
        .ai
        .generate_workout_plan(&UserContext::from(&user), body.days, body.preferences.as_ref())
        .await
        .map_err(AppError::upstream)?;

    let plan = store_plan(&state.db, user.id, PlanKind::Workout, body.days, content).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn list_plans(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<PlanQuery>,
) -> AppResult<Json<Vec<PlanSummary>>> {
    let plans = sqlx::query_as::<_, PlanSummary>(
        r#"
        SELECT id, kind, days, created_at FROM plans
        WHERE user_id = $1 AND ($2::text IS NULL OR kind = $2)
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(auth_user.id)
    .bind(query.kind.map(|k| k.as_str()))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(plans))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1 AND user_id = $2")
        .bind(plan_id)
        .bind(auth_user.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Plan not found".into()))?;

    Ok(Json(plan))
}
