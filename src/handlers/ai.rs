use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::dto::{ChatRequest, QuickMealRequest, QuickQueryRequest};
use crate::error::{AppError, AppResult};
use crate::models::user::User;
use crate::services::ai_client::{ChatReply, QuickMealSuggestionRequest, QuickReply, UserContext};
use crate::AppState;

const DEFAULT_MEAL_CALORIES: i32 = 500;

/// A quarter of the daily target, within the range the AI service accepts.
fn default_meal_calories(user: &User) -> i32 {
    user.calculated_metrics()
        .map(|m| (m.daily_calorie_target / 4).clamp(100, 2000))
        .unwrap_or(DEFAULT_MEAL_CALORIES)
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatReply>> {
    body.validate()?;

    let user = User::fetch(&state.db, auth_user.id).await?;
    let context = UserContext::from(&user);

    let reply = state
        .ai
        .chat(&body.message, &body.conversation_history, &context)
        .await
        .map_err(AppError::upstream)?;

    tracing::debug!(user_id = %auth_user.id, tokens = reply.tokens_used, "Chat reply");
    Ok(Json(reply))
}

pub async fn quick_query(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<QuickQueryRequest>,
) -> AppResult<Json<QuickReply>> {
    body.validate()?;

    let context = if body.personalize {
        let user = User::fetch(&state.db, auth_user.id).await?;
        Some(UserContext::from(&user))
    } else {
        None
    };

    let reply = state
        .ai
        .quick_query(&body.query, context.as_ref())
        .await
        .map_err(AppError::upstream)?;
    Ok(Json(reply))
}

/// Suggestions respect the stored diet type and allergies; disliked foods
/// are excluded along with anything listed in the request.
pub async fn quick_meal(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<QuickMealRequest>,
) -> AppResult<Json<serde_json::Value>> {
    body.validate()?;

    let user = User::fetch(&state.db, auth_user.id).await?;

    let mut exclude = body.exclude_ingredients.clone();
    for disliked in &user.disliked_foods {
        if !exclude.contains(disliked) {
            exclude.push(disliked.clone());
        }
    }

    let request = QuickMealSuggestionRequest {
        meal_type: body.meal_type.as_str(),
        max_calories: body.max_calories.unwrap_or_else(|| default_meal_calories(&user)),
        diet_type: &user.diet_type,
        exclude_ingredients: &exclude,
        allergies: &user.allergies,
    };

    let suggestions = state
        .ai
        .quick_meal_suggestion(&request)
        .await
        .map_err(AppError::upstream)?;
    Ok(Json(suggestions))
}
