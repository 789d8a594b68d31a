use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sqlx::{types::Json as SqlJson, PgConnection};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{CreateMealRequest, DeleteResponse, FoodItemInput, MealQuery, UpdateMealRequest};
use crate::error::{AppError, AppResult};
use crate::models::meal::{FoodItem, FoodSource, MealLog, MealLogResponse, MealTotals, MealType, Portion};
use crate::services::glycemic::{aggregate_meal_totals, build_food_item};
use crate::services::reference::ReferenceData;
use crate::AppState;

const MAX_FOODS_PER_MEAL: usize = 50;

/// Reference nutrition is per gram weight; other units have no conversion.
fn is_gram_unit(unit: Option<&str>) -> bool {
    match unit.map(|u| u.trim().to_lowercase()) {
        None => true,
        Some(u) => matches!(u.as_str(), "g" | "gram" | "grams"),
    }
}

/// Turn a request food into a stored item.
///
/// Explicit nutrition is taken as-is. Otherwise the name must resolve in the
/// reference table and `amount` is read as grams.
pub(crate) fn food_from_input(input: &FoodItemInput, reference: &ReferenceData) -> AppResult<FoodItem> {
    input.validate_all()?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Food name must not be blank".into()));
    }

    match input.nutrition {
        Some(nutrition) => Ok(build_food_item(
            name.to_string(),
            Portion {
                amount: input.amount.unwrap_or(1.0),
                unit: input.unit.clone().unwrap_or_else(|| "serving".into()),
            },
            nutrition.into(),
            input.glycemic_index.or_else(|| reference.gi_value(name)),
            FoodSource::Manual,
            None,
        )),
        None => {
            if !is_gram_unit(input.unit.as_deref()) {
                return Err(AppError::Validation(format!(
                    "Unit '{}' needs explicit nutrition values, reference foods are measured in grams",
                    input.unit.as_deref().unwrap_or_default().trim()
                )));
            }
            let item = reference
                .food_item(name, input.amount, FoodSource::Manual, None)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "No reference nutrition for '{}', provide nutrition values",
                        name
                    ))
                })?;
            Ok(match input.glycemic_index {
                Some(gi) => build_food_item(item.name, item.portion, item.nutrition, Some(gi), item.source, None),
                None => item,
            })
        }
    }
}

pub(crate) fn foods_from_input(inputs: &[FoodItemInput], reference: &ReferenceData) -> AppResult<Vec<FoodItem>> {
    inputs.iter().map(|i| food_from_input(i, reference)).collect()
}

pub(crate) async fn insert_meal(
    db: &sqlx::PgPool,
    user_id: Uuid,
    meal_type: MealType,
    eaten_at: DateTime<Utc>,
    notes: Option<&str>,
    foods: Vec<FoodItem>,
) -> AppResult<MealLog> {
    let totals = aggregate_meal_totals(&foods);

    let meal = sqlx::query_as::<_, MealLog>(
        r#"
        INSERT INTO meal_logs (
            id, user_id, meal_type, eaten_at, notes, foods,
            total_calories, total_protein, total_carbs, total_fat, total_fiber,
            average_gi, total_gl
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(meal_type.as_str())
    .bind(eaten_at)
    .bind(notes)
    .bind(SqlJson(foods))
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.carbs)
    .bind(totals.fat)
    .bind(totals.fiber)
    .bind(totals.average_gi)
    .bind(totals.total_gl)
    .fetch_one(db)
    .await?;

    Ok(meal)
}

/// Append `item` to a meal's foods and return the totals it now adds up to.
fn push_food(foods: &mut Vec<FoodItem>, item: FoodItem) -> AppResult<MealTotals> {
    if foods.len() >= MAX_FOODS_PER_MEAL {
        return Err(AppError::Validation(format!(
            "A meal can hold at most {} foods",
            MAX_FOODS_PER_MEAL
        )));
    }
    foods.push(item);
    Ok(aggregate_meal_totals(foods))
}

fn remove_food_at(foods: &mut Vec<FoodItem>, index: usize) -> AppResult<MealTotals> {
    if index >= foods.len() {
        return Err(AppError::NotFound("Food not found in meal".into()));
    }
    foods.remove(index);
    Ok(aggregate_meal_totals(foods))
}

async fn lock_meal(conn: &mut PgConnection, meal_id: Uuid, user_id: Uuid) -> AppResult<MealLog> {
    sqlx::query_as::<_, MealLog>(
        "SELECT * FROM meal_logs WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::NotFound("Meal not found".into()))
}

/// Rewrite a locked meal. `totals` must be the aggregate of `meal.foods`; both
/// land in the same row update.
async fn save_meal(conn: &mut PgConnection, meal: MealLog, totals: MealTotals) -> AppResult<MealLog> {
    let saved = sqlx::query_as::<_, MealLog>(
        r#"
        UPDATE meal_logs SET
            meal_type = $3, eaten_at = $4, notes = $5, foods = $6,
            total_calories = $7, total_protein = $8, total_carbs = $9,
            total_fat = $10, total_fiber = $11, average_gi = $12, total_gl = $13,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(meal.id)
    .bind(meal.user_id)
    .bind(&meal.meal_type)
    .bind(meal.eaten_at)
    .bind(&meal.notes)
    .bind(&meal.foods)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.carbs)
    .bind(totals.fat)
    .bind(totals.fiber)
    .bind(totals.average_gi)
    .bind(totals.total_gl)
    .fetch_one(conn)
    .await?;

    Ok(saved)
}

pub async fn create_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateMealRequest>,
) -> AppResult<(StatusCode, Json<MealLogResponse>)> {
    body.validate()?;

    let reference = state.reference.snapshot().await;
    let foods = foods_from_input(&body.foods, &reference)?;

    let meal = insert_meal(
        &state.db,
        auth_user.id,
        body.meal_type,
        body.eaten_at.unwrap_or_else(Utc::now),
        body.notes.as_deref(),
        foods,
    )
    .await?;

    tracing::debug!(user_id = %auth_user.id, meal_id = %meal.id, "Meal logged");
    Ok((StatusCode::CREATED, Json(meal.into())))
}

pub async fn list_meals(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<MealQuery>,
) -> AppResult<Json<Vec<MealLogResponse>>> {
    let meals = sqlx::query_as::<_, MealLog>(
        r#"
        SELECT * FROM meal_logs
        WHERE user_id = $1
          AND ($2::timestamptz IS NULL OR eaten_at >= $2)
          AND ($3::timestamptz IS NULL OR eaten_at < $3)
          AND ($4::text IS NULL OR meal_type = $4)
        ORDER BY eaten_at DESC
        LIMIT 200
        "#,
    )
    .bind(auth_user.id)
    .bind(query.from)
    .bind(query.to)
    .bind(query.meal_type.map(|m| m.as_str()))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(meals.into_iter().map(Into::into).collect()))
}

pub async fn get_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(meal_id): Path<Uuid>,
) -> AppResult<Json<MealLogResponse>> {
    let meal = sqlx::query_as::<_, MealLog>(
        "SELECT * FROM meal_logs WHERE id = $1 AND user_id = $2",
    )
    .bind(meal_id)
    .bind(auth_user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or(AppError::NotFound("Meal not found".into()))?;

    Ok(Json(meal.into()))
}

pub async fn update_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(meal_id): Path<Uuid>,
    Json(body): Json<UpdateMealRequest>,
) -> AppResult<Json<MealLogResponse>> {
    body.validate()?;

    let foods = match &body.foods {
        Some(inputs) => {
            let reference = state.reference.snapshot().await;
            Some(foods_from_input(inputs, &reference)?)
        }
        None => None,
    };

    let mut tx = state.db.begin().await?;
    let mut meal = lock_meal(&mut tx, meal_id, auth_user.id).await?;

    if let Some(meal_type) = body.meal_type {
        meal.meal_type = meal_type.as_str().to_string();
    }
    if let Some(eaten_at) = body.eaten_at {
        meal.eaten_at = eaten_at;
    }
    if body.notes.is_some() {
        meal.notes = body.notes;
    }
    if let Some(foods) = foods {
        meal.foods = SqlJson(foods);
    }
    let totals = aggregate_meal_totals(&meal.foods.0);

    let saved = save_meal(&mut tx, meal, totals).await?;
    tx.commit().await?;

    Ok(Json(saved.into()))
}

pub async fn delete_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(meal_id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    let result = sqlx::query("DELETE FROM meal_logs WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(auth_user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Meal not found".into()));
    }

    Ok(Json(DeleteResponse {
        deleted: true,
        id: meal_id,
    }))
}

pub async fn add_food(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(meal_id): Path<Uuid>,
    Json(body): Json<FoodItemInput>,
) -> AppResult<Json<MealLogResponse>> {
    let reference = state.reference.snapshot().await;
    let item = food_from_input(&body, &reference)?;

    let mut tx = state.db.begin().await?;
    let mut meal = lock_meal(&mut tx, meal_id, auth_user.id).await?;

    let totals = push_food(&mut meal.foods.0, item)?;

    let saved = save_meal(&mut tx, meal, totals).await?;
    tx.commit().await?;

    Ok(Json(saved.into()))
}

pub async fn remove_food(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((meal_id, index)): Path<(Uuid, usize)>,
) -> AppResult<Json<MealLogResponse>> {
    let mut tx = state.db.begin().await?;
    let mut meal = lock_meal(&mut tx, meal_id, auth_user.id).await?;

    let totals = remove_food_at(&mut meal.foods.0, index)?;

    let saved = save_meal(&mut tx, meal, totals).await?;
    tx.commit().await?;

    Ok(Json(saved.into()))
}
