use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Nutrients for one portion (or per 100 g on reference entries).
/// Sodium and cholesterol are in milligrams, everything else in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub saturated_fat: f64,
    pub cholesterol: f64,
}

impl Nutrition {
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fat: self.fat * multiplier,
            fiber: self.fiber * multiplier,
            sugar: self.sugar * multiplier,
            sodium: self.sodium * multiplier,
            saturated_fat: self.saturated_fat * multiplier,
            cholesterol: self.cholesterol * multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portion {
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlycemicCategory {
    Low,
    Medium,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlycemicIndex {
    pub value: Option<f64>,
    pub category: GlycemicCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlycemicLoad {
    pub value: Option<f64>,
    pub category: GlycemicCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodSource {
    Manual,
    AiDetection,
}

/// A food inside a meal log. GI and GL are snapshotted when the item is built
/// so old logs don't move when reference data changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub portion: Portion,
    pub nutrition: Nutrition,
    pub glycemic_index: GlycemicIndex,
    pub glycemic_load: GlycemicLoad,
    pub source: FoodSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MealTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub average_gi: Option<f64>,
    pub total_gl: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: String,
    pub eaten_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub foods: Json<Vec<FoodItem>>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub average_gi: Option<f64>,
    pub total_gl: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MealLog {
    pub fn totals(&self) -> MealTotals {
        MealTotals {
            calories: self.total_calories,
            protein: self.total_protein,
            carbs: self.total_carbs,
            fat: self.total_fat,
            fiber: self.total_fiber,
            average_gi: self.average_gi,
            total_gl: self.total_gl,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MealLogResponse {
    pub id: Uuid,
    pub meal_type: String,
    pub eaten_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub foods: Vec<FoodItem>,
    pub totals: MealTotals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MealLog> for MealLogResponse {
    fn from(m: MealLog) -> Self {
        let totals = m.totals();
        Self {
            id: m.id,
            meal_type: m.meal_type,
            eaten_at: m.eaten_at,
            notes: m.notes,
            foods: m.foods.0,
            totals,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
