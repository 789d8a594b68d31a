use axum::{extract::State, Extension, Json};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{DietaryRequest, GoalsRequest, MetricsResponse, PhysicalProfileRequest};
use crate::error::{AppError, AppResult};
use crate::models::profile::{FitnessGoal, PhysicalProfile};
use crate::models::user::{User, UserProfile};
use crate::services::metrics::{missing_profile_fields, recompute_metrics};
use crate::AppState;

async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))
}

/// Write profile, goal and the metrics derived from them in one statement.
/// An incomplete profile clears the stored metrics.
async fn save_profile_with_metrics(
    conn: &mut PgConnection,
    user_id: Uuid,
    physical: &PhysicalProfile,
    sex: Option<&str>,
    goal: &FitnessGoal,
) -> AppResult<User> {
    let metrics = recompute_metrics(physical, goal);

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            weight_kg = $2, height_cm = $3, age = $4, sex = $5,
            primary_goal = $6, activity_level = $7, target_weight_kg = $8,
            bmr = $9, tdee = $10, daily_calorie_target = $11,
            protein_target_g = $12, carbs_target_g = $13, fat_target_g = $14,
            metrics_updated_at = CASE WHEN $9::int IS NULL THEN NULL ELSE NOW() END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(physical.weight_kg)
    .bind(physical.height_cm)
    .bind(physical.age)
    .bind(sex)
    .bind(goal.primary_goal.as_str())
    .bind(goal.activity_level.as_str())
    .bind(goal.target_weight_kg)
    .bind(metrics.map(|m| m.bmr))
    .bind(metrics.map(|m| m.tdee))
    .bind(metrics.map(|m| m.daily_calorie_target))
    .bind(metrics.map(|m| m.macro_targets.protein))
    .bind(metrics.map(|m| m.macro_targets.carbs))
    .bind(metrics.map(|m| m.macro_targets.fat))
    .fetch_one(conn)
    .await?;

    match metrics {
        Some(m) => tracing::debug!(
            user_id = %user_id,
            bmr = m.bmr,
            tdee = m.tdee,
            target = m.daily_calorie_target,
            "Metrics recomputed"
        ),
        None => tracing::debug!(
            user_id = %user_id,
            missing = ?missing_profile_fields(physical),
            "Profile incomplete, metrics cleared"
        ),
    }

    Ok(user)
}

pub async fn update_physical(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<PhysicalProfileRequest>,
) -> AppResult<Json<UserProfile>> {
    body.validate()?;

    let mut tx = state.db.begin().await?;
    let current = lock_user(&mut tx, auth_user.id).await?;

    let mut physical = current.physical_profile();
    body.apply_to(&mut physical);
    let sex = body.sex.map(|s| s.as_str()).or(current.sex.as_deref());

    let user = save_profile_with_metrics(
        &mut tx,
        auth_user.id,
        &physical,
        sex,
        &current.fitness_goal(),
    )
    .await?;
    tx.commit().await?;

    Ok(Json(user.into()))
}

pub async fn update_goals(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<GoalsRequest>,
) -> AppResult<Json<UserProfile>> {
    body.validate()?;

    let mut tx = state.db.begin().await?;
    let current = lock_user(&mut tx, auth_user.id).await?;

    let mut goal = current.fitness_goal();
    body.apply_to(&mut goal);

    let user = save_profile_with_metrics(
        &mut tx,
        auth_user.id,
        &current.physical_profile(),
        current.sex.as_deref(),
        &goal,
    )
    .await?;
    tx.commit().await?;

    Ok(Json(user.into()))
}

/// Trim, lower-case and de-duplicate a free-text list, keeping first-seen order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_lowercase();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Normalised diet type; blank after trimming is rejected rather than stored.
fn clean_diet_type(diet_type: Option<&str>) -> AppResult<Option<String>> {
    match diet_type.map(|d| d.trim().to_lowercase()) {
        Some(d) if d.is_empty() => Err(AppError::Validation("Diet type must not be blank".into())),
        other => Ok(other),
    }
}

pub async fn update_dietary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<DietaryRequest>,
) -> AppResult<Json<UserProfile>> {
    body.validate()?;
    let diet_type = clean_diet_type(body.diet_type.as_deref())?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            diet_type = COALESCE($2, diet_type),
            allergies = COALESCE($3, allergies),
            disliked_foods = COALESCE($4, disliked_foods),
            preferred_cuisines = COALESCE($5, preferred_cuisines),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(auth_user.id)
    .bind(diet_type)
    .bind(body.allergies.map(clean_list))
    .bind(body.disliked_foods.map(clean_list))
    .bind(body.preferred_cuisines.map(clean_list))
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

pub async fn get_metrics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<MetricsResponse>> {
    let user = User::fetch(&state.db, auth_user.id).await?;
    let metrics = user.calculated_metrics().ok_or_else(|| {
        AppError::Validation(format!(
            "Profile incomplete, missing: {}",
            missing_profile_fields(&user.physical_profile()).join(", ")
        ))
    })?;

    Ok(Json(MetricsResponse {
        metrics,
        updated_at: user.metrics_updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{PrimaryGoal, Sex};
    use crate::models::user::sample_user;
    use crate::services::metrics::{
        calculate_daily_calorie_target, calculate_macro_targets, goal_calorie_adjustment,
    };

    fn physical_request(json: serde_json::Value) -> PhysicalProfileRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_partial_physical_update_keeps_other_fields() {
        let user = sample_user();
        let mut physical = user.physical_profile();
        physical_request(serde_json::json!({ "weight_kg": 80.0 })).apply_to(&mut physical);

        assert_eq!(physical.weight_kg, Some(80.0));
        assert_eq!(physical.height_cm, Some(175.0));
        assert_eq!(physical.age, Some(30));
        assert_eq!(physical.sex, Sex::Male);

        // 10 kg heavier: +100 kcal BMR
        let before = recompute_metrics(&user.physical_profile(), &user.fitness_goal()).unwrap();
        let after = recompute_metrics(&physical, &user.fitness_goal()).unwrap();
        assert_eq!(after.bmr - before.bmr, 100);
    }

    #[test]
    fn test_sex_change_alone_shifts_bmr_by_offset() {
        let user = sample_user();
        let goal = user.fitness_goal();
        let mut physical = user.physical_profile();
        physical_request(serde_json::json!({ "sex": "female" })).apply_to(&mut physical);

        assert_eq!(physical.weight_kg, Some(70.0));
        let male = recompute_metrics(&user.physical_profile(), &goal).unwrap();
        let female = recompute_metrics(&physical, &goal).unwrap();
        // +5 vs -161
        assert_eq!(male.bmr, 1649);
        assert_eq!(female.bmr, 1483);
    }

    #[test]
    fn test_goal_change_updates_target_and_macros() {
        let user = sample_user();
        let physical = user.physical_profile();
        let mut goal = user.fitness_goal();
        let request: GoalsRequest =
            serde_json::from_value(serde_json::json!({ "primary_goal": "muscle_gain" })).unwrap();
        request.apply_to(&mut goal);

        assert_eq!(goal.primary_goal, PrimaryGoal::MuscleGain);
        assert_eq!(goal.activity_level, user.fitness_goal().activity_level);

        let before = user.calculated_metrics().unwrap();
        let after = recompute_metrics(&physical, &goal).unwrap();
        assert_eq!(after.bmr, before.bmr);
        assert_eq!(after.tdee, before.tdee);
        assert_eq!(
            after.daily_calorie_target,
            before.tdee + goal_calorie_adjustment(PrimaryGoal::MuscleGain)
        );
        assert_eq!(
            after.daily_calorie_target,
            calculate_daily_calorie_target(after.tdee, PrimaryGoal::MuscleGain)
        );
        assert_eq!(
            after.macro_targets,
            calculate_macro_targets(after.daily_calorie_target, PrimaryGoal::MuscleGain)
        );
        assert_ne!(after.macro_targets, before.macro_targets);
    }

    #[test]
    fn test_empty_update_reproduces_stored_metrics() {
        let user = sample_user();
        let mut physical = user.physical_profile();
        physical_request(serde_json::json!({})).apply_to(&mut physical);
        assert_eq!(physical, user.physical_profile());
        assert_eq!(
            recompute_metrics(&physical, &user.fitness_goal()),
            user.calculated_metrics()
        );
    }

    #[test]
    fn test_clean_diet_type() {
        assert_eq!(clean_diet_type(Some(" Vegan ")).unwrap(), Some("vegan".to_string()));
        assert_eq!(clean_diet_type(None).unwrap(), None);
        assert!(matches!(clean_diet_type(Some("   ")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_clean_list() {
        let cleaned = clean_list(vec![
            " Peanuts ".into(),
            "".into(),
            "shellfish".into(),
            "peanuts".into(),
        ]);
        assert_eq!(cleaned, vec!["peanuts".to_string(), "shellfish".to_string()]);
    }
}
