use axum::{
    extract::{Path, State},
    Json,
};

use crate::dto::{ReferenceGlycemic, ReferenceLookupResponse, ReferenceNutrition};
use crate::error::{AppError, AppResult};
use crate::services::glycemic::{gi_category, gl_category};
use crate::services::reference::{normalize_food_name, ReferenceData};
use crate::AppState;

pub(crate) fn lookup(reference: &ReferenceData, name: &str) -> ReferenceLookupResponse {
    ReferenceLookupResponse {
        query: normalize_food_name(name),
        nutrition: reference.food(name).map(|e| ReferenceNutrition {
            name: e.name.clone(),
            aliases: e.aliases.clone(),
            default_serving_g: e.default_serving_g,
            per_100g: e.per_100g,
        }),
        glycemic: reference.glycemic_index(name).map(|e| ReferenceGlycemic {
            name: e.name.clone(),
            gi_value: e.gi_value,
            gi_category: gi_category(e.gi_value),
            serving_size_g: e.serving_size_g,
            carbs_per_serving_g: e.carbs_per_serving_g,
            gl_per_serving: e.gl_per_serving,
            gl_category: gl_category(e.gl_per_serving),
        }),
    }
}

/// GET /api/reference/foods/:name
pub async fn lookup_food(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ReferenceLookupResponse>> {
    let reference = state.reference.snapshot().await;
    let found = lookup(&reference, &name);

    if found.nutrition.is_none() && found.glycemic.is_none() {
        return Err(AppError::NotFound(format!("No reference data for '{}'", found.query)));
    }
    Ok(Json(found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::meal::GlycemicCategory;
    use crate::services::reference::sample_reference_data;

    #[test]
    fn test_lookup_by_alias_returns_both_tables() {
        let found = lookup(&sample_reference_data(), "Rice");
        assert_eq!(found.query, "rice");
        assert_eq!(found.nutrition.unwrap().name, "white rice");
        let gi = found.glycemic.unwrap();
        assert_eq!(gi.gi_value, 73.0);
        assert_eq!(gi.gi_category, GlycemicCategory::High);
    }

    #[test]
    fn test_lookup_nutrition_only() {
        let found = lookup(&sample_reference_data(), "chicken breast");
        assert!(found.nutrition.is_some());
        assert!(found.glycemic.is_none());
    }
}
