//! Glycemic load per food item and per-meal totals.

use crate::models::meal::{
    FoodItem, FoodSource, GlycemicCategory, GlycemicIndex, GlycemicLoad, MealTotals, Nutrition,
    Portion,
};

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn gi_category(gi: f64) -> GlycemicCategory {
    if gi <= 55.0 {
        GlycemicCategory::Low
    } else if gi <= 69.0 {
        GlycemicCategory::Medium
    } else {
        GlycemicCategory::High
    }
}

/// Lower bounds are inclusive: 10.0 is medium, 20.0 is high.
pub fn gl_category(gl: f64) -> GlycemicCategory {
    if gl < 10.0 {
        GlycemicCategory::Low
    } else if gl < 20.0 {
        GlycemicCategory::Medium
    } else {
        GlycemicCategory::High
    }
}

pub fn glycemic_index(gi: Option<f64>) -> GlycemicIndex {
    match gi {
        Some(value) => GlycemicIndex { value: Some(value), category: gi_category(value) },
        None => GlycemicIndex { value: None, category: GlycemicCategory::Unknown },
    }
}

/// GL = GI * net carbs / 100, where net carbs = carbs - fiber clamped at zero.
///
/// An unknown GI yields an explicit `Unknown` category instead of an error.
pub fn compute_gl(gi: Option<f64>, carbs: f64, fiber: f64) -> GlycemicLoad {
    let Some(gi) = gi else {
        return GlycemicLoad { value: None, category: GlycemicCategory::Unknown };
    };

    let net_carbs = (carbs - fiber).max(0.0);
    let value = round1(gi * net_carbs / 100.0);
    GlycemicLoad { value: Some(value), category: gl_category(value) }
}

/// Build a meal item with its GI and GL fixed at this moment.
pub fn build_food_item(
    name: String,
    portion: Portion,
    nutrition: Nutrition,
    gi: Option<f64>,
    source: FoodSource,
    confidence: Option<f64>,
) -> FoodItem {
    FoodItem {
        glycemic_index: glycemic_index(gi),
        glycemic_load: compute_gl(gi, nutrition.carbs, nutrition.fiber),
        name,
        portion,
        nutrition,
        source,
        confidence,
    }
}

/// Sum in ascending order so the result doesn't depend on list order.
fn stable_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}

/// Totals for a meal. Calories round to whole kcal, grams to 0.1.
///
/// `average_gi` is the rounded mean of the known GI values and `total_gl`
/// the sum of the known GL values; both are `None` when no item has one.
/// Items with unknown GI still count towards the nutrient sums.
pub fn aggregate_meal_totals(foods: &[FoodItem]) -> MealTotals {
    let sum_of = |f: fn(&Nutrition) -> f64| stable_sum(foods.iter().map(|i| f(&i.nutrition)).collect());

    let known_gi: Vec<f64> = foods.iter().filter_map(|i| i.glycemic_index.value).collect();
    let known_gl: Vec<f64> = foods.iter().filter_map(|i| i.glycemic_load.value).collect();

    let average_gi = if known_gi.is_empty() {
        None
    } else {
        let count = known_gi.len() as f64;
        Some((stable_sum(known_gi) / count).round())
    };
    let total_gl = if known_gl.is_empty() {
        None
    } else {
        Some(round1(stable_sum(known_gl)))
    };

    MealTotals {
        calories: sum_of(|n| n.calories).round(),
        protein: round1(sum_of(|n| n.protein)),
        carbs: round1(sum_of(|n| n.carbs)),
        fat: round1(sum_of(|n| n.fat)),
        fiber: round1(sum_of(|n| n.fiber)),
        average_gi,
        total_gl,
    }
}
