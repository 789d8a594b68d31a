use serde::Serialize;
use sqlx::FromRow;

use crate::models::meal::Nutrition;

/// Row of `food_nutrition`: nutrients per 100 g plus a typical serving.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FoodNutritionEntry {
    pub id: i32,
    pub name: String,
    pub aliases: Vec<String>,
    pub default_serving_g: f64,
    #[sqlx(flatten)]
    pub per_100g: Nutrition,
}

/// Row of `glycemic_index`. `gl_per_serving` is a generated column.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GiReferenceEntry {
    pub id: i32,
    pub name: String,
    pub aliases: Vec<String>,
    pub gi_value: f64,
    pub serving_size_g: f64,
    pub carbs_per_serving_g: f64,
    pub gl_per_serving: f64,
}
