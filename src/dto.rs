//! # NutriVision: Request/Response DTOs
//!
//! API contract types that don't belong to a single model.
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Query`    → deserialized from query params
//! - `*Response` → serialized to client JSON
//! - Range checks are `validator` derives; the engines downstream only check
//!   presence.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::jwt::TokenPair;
use crate::models::meal::{FoodItem, MealTotals, MealType, Nutrition};
use crate::models::profile::{
    ActivityLevel, CalculatedMetrics, FitnessGoal, PhysicalProfile, PrimaryGoal, Sex,
};
use crate::models::user::UserProfile;
use crate::services::ai_client::{BoundingBox, ChatTurn, ImageDimensions};

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
    pub id: Uuid,
}

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,
}

/// POST /api/auth/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// POST /api/auth/refresh
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Register and login return the token pair plus the profile.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserProfile,
}

// ============================================================================
// Profile
// ============================================================================

/// PUT /api/profile/physical: only the fields present are changed.
#[derive(Debug, Deserialize, Validate)]
pub struct PhysicalProfileRequest {
    #[validate(range(min = 20.0, max = 500.0, message = "Weight must be 20-500 kg"))]
    pub weight_kg: Option<f64>,

    #[validate(range(min = 50.0, max = 300.0, message = "Height must be 50-300 cm"))]
    pub height_cm: Option<f64>,

    #[validate(range(min = 13, max = 120, message = "Age must be 13-120"))]
    pub age: Option<i32>,

    pub sex: Option<Sex>,
}

impl PhysicalProfileRequest {
    /// Overlay the fields present in the request; absent ones keep their value.
    pub fn apply_to(&self, profile: &mut PhysicalProfile) {
        if self.weight_kg.is_some() {
            profile.weight_kg = self.weight_kg;
        }
        if self.height_cm.is_some() {
            profile.height_cm = self.height_cm;
        }
        if self.age.is_some() {
            profile.age = self.age;
        }
        if let Some(sex) = self.sex {
            profile.sex = sex;
        }
    }
}

/// PUT /api/profile/goals
#[derive(Debug, Deserialize, Validate)]
pub struct GoalsRequest {
    pub primary_goal: Option<PrimaryGoal>,
    pub activity_level: Option<ActivityLevel>,

    #[validate(range(min = 20.0, max = 500.0, message = "Target weight must be 20-500 kg"))]
    pub target_weight_kg: Option<f64>,
}

impl GoalsRequest {
    pub fn apply_to(&self, goal: &mut FitnessGoal) {
        if let Some(primary_goal) = self.primary_goal {
            goal.primary_goal = primary_goal;
        }
        if let Some(activity_level) = self.activity_level {
            goal.activity_level = activity_level;
        }
        if self.target_weight_kg.is_some() {
            goal.target_weight_kg = self.target_weight_kg;
        }
    }
}

/// PUT /api/profile/dietary
#[derive(Debug, Deserialize, Validate)]
pub struct DietaryRequest {
    #[validate(length(min = 1, max = 50))]
    pub diet_type: Option<String>,
    #[validate(length(max = 50))]
    pub allergies: Option<Vec<String>>,
    #[validate(length(max = 100))]
    pub disliked_foods: Option<Vec<String>>,
    #[validate(length(max = 50))]
    pub preferred_cuisines: Option<Vec<String>>,
}

/// GET /api/profile/metrics
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub metrics: CalculatedMetrics,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Meals
// ============================================================================

/// Nutrients for the portion as eaten. Absent fields count as zero.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct NutritionInput {
    #[validate(range(min = 0.0, max = 10000.0))]
    pub calories: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub protein: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub carbs: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub fat: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub fiber: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub sugar: f64,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub sodium: f64,
    #[validate(range(min = 0.0, max = 1000.0))]
    pub saturated_fat: f64,
    #[validate(range(min = 0.0, max = 100000.0))]
    pub cholesterol: f64,
}

impl From<NutritionInput> for Nutrition {
    fn from(n: NutritionInput) -> Self {
        Nutrition {
            calories: n.calories,
            protein: n.protein,
            carbs: n.carbs,
            fat: n.fat,
            fiber: n.fiber,
            sugar: n.sugar,
            sodium: n.sodium,
            saturated_fat: n.saturated_fat,
            cholesterol: n.cholesterol,
        }
    }
}

/// One food in a meal request.
///
/// Without `nutrition` the food is looked up in the reference table and
/// scaled to `amount` grams (or its default serving). Without
/// `glycemic_index` the GI comes from the reference table when known.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct FoodItemInput {
    #[validate(length(min = 1, max = 200, message = "Food name must be 1-200 characters"))]
    pub name: String,

    #[validate(range(min = 0.0, max = 10000.0, message = "Amount must be 0-10000"))]
    pub amount: Option<f64>,

    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,

    pub nutrition: Option<NutritionInput>,

    #[validate(range(min = 0.0, max = 100.0, message = "Glycemic index must be 0-100"))]
    pub glycemic_index: Option<f64>,
}

impl FoodItemInput {
    /// Validate the item and its nested nutrients.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        if let Some(nutrition) = &self.nutrition {
            nutrition.validate()?;
        }
        Ok(())
    }
}

/// POST /api/meals
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMealRequest {
    pub meal_type: MealType,

    /// Defaults to now.
    pub eaten_at: Option<DateTime<Utc>>,

    #[validate(length(max = 1000, message = "Notes must be under 1000 characters"))]
    pub notes: Option<String>,

    #[validate(length(max = 50, message = "A meal can hold at most 50 foods"))]
    #[serde(default)]
    pub foods: Vec<FoodItemInput>,
}

/// PUT /api/meals/:id: `foods`, when present, replaces the whole list.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMealRequest {
    pub meal_type: Option<MealType>,
    pub eaten_at: Option<DateTime<Utc>>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,

    #[validate(length(max = 50))]
    pub foods: Option<Vec<FoodItemInput>>,
}

/// GET /api/meals?from=&to=&meal_type=
#[derive(Debug, Deserialize)]
pub struct MealQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub meal_type: Option<MealType>,
}

// ============================================================================
// Image analysis
// ============================================================================

/// POST /api/analyze/image?meal_type=lunch: with `meal_type` the detected
/// foods are also saved as a meal.
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub meal_type: Option<MealType>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzedFood {
    #[serde(flatten)]
    pub item: FoodItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// Detection that matched no reference food; not counted in totals.
#[derive(Debug, Serialize)]
pub struct UnrecognizedFood {
    pub name: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_grams: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeImageResponse {
    pub foods: Vec<AnalyzedFood>,
    pub unrecognized: Vec<UnrecognizedFood>,
    pub totals: MealTotals,
    pub image_dimensions: ImageDimensions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_id: Option<Uuid>,
}

// ============================================================================
// Reference lookup
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReferenceNutrition {
    pub name: String,
    pub aliases: Vec<String>,
    pub default_serving_g: f64,
    pub per_100g: Nutrition,
}

#[derive(Debug, Serialize)]
pub struct ReferenceGlycemic {
    pub name: String,
    pub gi_value: f64,
    pub gi_category: crate::models::meal::GlycemicCategory,
    pub serving_size_g: f64,
    pub carbs_per_serving_g: f64,
    pub gl_per_serving: f64,
    pub gl_category: crate::models::meal::GlycemicCategory,
}

/// GET /api/reference/foods/:name
#[derive(Debug, Serialize)]
pub struct ReferenceLookupResponse {
    pub query: String,
    pub nutrition: Option<ReferenceNutrition>,
    pub glycemic: Option<ReferenceGlycemic>,
}

// ============================================================================
// Daily summary
// ============================================================================

/// GET /api/summary/daily?date=2026-03-01&tz_offset_minutes=-300
#[derive(Debug, Deserialize)]
pub struct DailySummaryQuery {
    pub date: Option<NaiveDate>,

    /// Client offset from UTC (-720..=840); defines where the day starts.
    pub tz_offset_minutes: Option<i32>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Remaining {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub date: NaiveDate,
    pub meal_count: usize,
    pub consumed: MealTotals,
    pub targets: Option<CalculatedMetrics>,
    pub remaining: Option<Remaining>,
}

// ============================================================================
// AI proxy
// ============================================================================

/// POST /api/ai/chat
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000, message = "Message must be 1-2000 characters"))]
    pub message: String,

    #[validate(length(max = 50))]
    #[serde(default)]
    pub conversation_history: Vec<ChatTurn>,
}

/// POST /api/ai/quick-query
#[derive(Debug, Deserialize, Validate)]
pub struct QuickQueryRequest {
    #[validate(length(min = 1, max = 500, message = "Query must be 1-500 characters"))]
    pub query: String,

    /// Send the caller's profile along with the question.
    #[serde(default)]
    pub personalize: bool,
}

/// POST /api/ai/quick-meal
#[derive(Debug, Deserialize, Validate)]
pub struct QuickMealRequest {
    pub meal_type: MealType,

    /// Defaults to a quarter of the daily target, or 500 without metrics.
    #[validate(range(min = 100, max = 2000, message = "max_calories must be 100-2000"))]
    pub max_calories: Option<i32>,

    #[validate(length(max = 50))]
    #[serde(default)]
    pub exclude_ingredients: Vec<String>,
}

// ============================================================================
// Plans
// ============================================================================

fn default_plan_days() -> i32 {
    7
}

fn default_true() -> bool {
    true
}

/// POST /api/plans/meal and /api/plans/workout
#[derive(Debug, Deserialize, Validate)]
pub struct PlanRequest {
    #[validate(range(min = 1, max = 7, message = "Plans cover 1-7 days"))]
    #[serde(default = "default_plan_days")]
    pub days: i32,

    /// Meal plans only.
    #[serde(default = "default_true")]
    pub include_snacks: bool,

    /// Workout plans only; passed through to the AI service.
    pub preferences: Option<serde_json::Value>,
}

/// GET /api/plans?kind=meal
#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub kind: Option<crate::models::plan::PlanKind>,
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub reference_foods: usize,
    pub reference_glycemic: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physical_profile_ranges() {
        let ok: PhysicalProfileRequest = serde_json::from_value(serde_json::json!({
            "weight_kg": 70.0, "height_cm": 175.0, "age": 30, "sex": "female"
        }))
        .unwrap();
        assert!(ok.validate().is_ok());

        for bad in [
            serde_json::json!({ "weight_kg": 19.9 }),
            serde_json::json!({ "weight_kg": -5.0 }),
            serde_json::json!({ "height_cm": 301.0 }),
            serde_json::json!({ "age": 12 }),
            serde_json::json!({ "age": 121 }),
        ] {
            let req: PhysicalProfileRequest = serde_json::from_value(bad.clone()).unwrap();
            assert!(req.validate().is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn test_empty_profile_update_is_valid() {
        let req: PhysicalProfileRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_ok());
        assert!(req.weight_kg.is_none() && req.sex.is_none());
    }

    #[test]
    fn test_unknown_goal_is_accepted_as_unrecognized() {
        let req: GoalsRequest =
            serde_json::from_str(r#"{"primary_goal": "bulk_forever"}"#).unwrap();
        assert_eq!(req.primary_goal, Some(PrimaryGoal::Unrecognized));
    }

    #[test]
    fn test_food_item_rejects_negative_nutrients_and_bad_gi() {
        let item: FoodItemInput = serde_json::from_value(serde_json::json!({
            "name": "toast",
            "nutrition": { "calories": 80.0, "carbs": -1.0 }
        }))
        .unwrap();
        assert!(item.validate().is_ok());
        assert!(item.validate_all().is_err());

        let item: FoodItemInput = serde_json::from_value(serde_json::json!({
            "name": "toast", "glycemic_index": 101.0
        }))
        .unwrap();
        assert!(item.validate_all().is_err());
    }

    #[test]
    fn test_partial_nutrition_defaults_to_zero() {
        let item: FoodItemInput = serde_json::from_value(serde_json::json!({
            "name": "egg", "amount": 50.0, "nutrition": { "calories": 72.0, "protein": 6.3 }
        }))
        .unwrap();
        let n: Nutrition = item.nutrition.unwrap().into();
        assert_eq!(n.calories, 72.0);
        assert_eq!(n.fiber, 0.0);
    }

    #[test]
    fn test_plan_request_defaults_and_range() {
        let req: PlanRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.days, 7);
        assert!(req.include_snacks);
        assert!(req.validate().is_ok());

        let req: PlanRequest = serde_json::from_str(r#"{"days": 8}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_requires_email_and_password_length() {
        let req = RegisterRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            first_name: "Ada".into(),
            last_name: None,
        };
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
