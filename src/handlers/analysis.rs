use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header::CONTENT_TYPE, HeaderMap},
    Extension, Json,
};
use chrono::Utc;

use crate::auth::middleware::AuthUser;
use crate::dto::{AnalyzeImageResponse, AnalyzeQuery, AnalyzedFood, UnrecognizedFood};
use crate::error::{AppError, AppResult};
use crate::handlers::meals::insert_meal;
use crate::models::meal::FoodSource;
use crate::services::ai_client::ImageAnalysis;
use crate::services::glycemic::aggregate_meal_totals;
use crate::services::reference::ReferenceData;
use crate::AppState;

/// Match detections against the reference tables. Each match is scaled to
/// the estimated portion (or the default serving); misses are reported apart
/// and excluded from totals.
pub(crate) fn enrich_detections(
    analysis: &ImageAnalysis,
    reference: &ReferenceData,
) -> (Vec<AnalyzedFood>, Vec<UnrecognizedFood>) {
    let mut foods = Vec::new();
    let mut unrecognized = Vec::new();

    for detected in &analysis.detected_foods {
        let grams = analysis.portion_for(&detected.name);
        match reference.food_item(
            &detected.name,
            grams,
            FoodSource::AiDetection,
            Some(detected.confidence),
        ) {
            Some(item) => foods.push(AnalyzedFood {
                item,
                bounding_box: detected.bounding_box,
            }),
            None => unrecognized.push(UnrecognizedFood {
                name: detected.name.clone(),
                confidence: detected.confidence,
                estimated_grams: grams,
            }),
        }
    }

    (foods, unrecognized)
}

/// POST /api/analyze/image, raw image bytes in the body.
pub async fn analyze_image(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<AnalyzeQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<AnalyzeImageResponse>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.config.is_allowed_image_type(content_type) {
        return Err(AppError::Validation(format!(
            "Unsupported image type, allowed: {}",
            state.config.allowed_image_types.join(", ")
        )));
    }
    // oversize bodies were already rejected by the route's DefaultBodyLimit
    if body.is_empty() {
        return Err(AppError::Validation("Image body is empty".into()));
    }

    let analysis = state
        .ai
        .analyze_image(body.to_vec(), content_type)
        .await
        .map_err(AppError::upstream)?;

    let reference = state.reference.snapshot().await;
    let (foods, unrecognized) = enrich_detections(&analysis, &reference);
    let items: Vec<_> = foods.iter().map(|f| f.item.clone()).collect();
    let totals = aggregate_meal_totals(&items);

    tracing::info!(
        user_id = %auth_user.id,
        detected = analysis.detected_foods.len(),
        matched = foods.len(),
        "Image analysed"
    );

    let meal_id = match query.meal_type {
        Some(meal_type) if !items.is_empty() => {
            let meal = insert_meal(&state.db, auth_user.id, meal_type, Utc::now(), None, items).await?;
            Some(meal.id)
        }
        _ => None,
    };

    Ok(Json(AnalyzeImageResponse {
        foods,
        unrecognized,
        totals,
        image_dimensions: analysis.image_dimensions,
        meal_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_client::DetectedFood;
    use crate::services::reference::sample_reference_data;

    #[test]
    fn test_enrich_uses_portion_estimates_and_skips_unknown() {
        let analysis: ImageAnalysis = serde_json::from_value(serde_json::json!({
            "detected_foods": [
                {"name": "rice", "confidence": 0.92, "bounding_box": {"x": 1.0, "y": 2.0, "width": 30.0, "height": 20.0}},
                {"name": "apple", "confidence": 0.81},
                {"name": "chopsticks", "confidence": 0.40}
            ],
            "portion_estimates": {"rice": 200.0, "chopsticks": 15.0}
        }))
        .unwrap();

        let (foods, unrecognized) = enrich_detections(&analysis, &sample_reference_data());

        assert_eq!(foods.len(), 2);
        assert_eq!(foods[0].item.name, "white rice");
        assert_eq!(foods[0].item.portion.amount, 200.0);
        assert_eq!(foods[0].item.source, FoodSource::AiDetection);
        assert_eq!(foods[0].item.confidence, Some(0.92));
        assert!(foods[0].bounding_box.is_some());
        // no estimate: default serving
        assert_eq!(foods[1].item.portion.amount, 182.0);

        assert_eq!(unrecognized.len(), 1);
        assert_eq!(unrecognized[0].name, "chopsticks");
        assert_eq!(unrecognized[0].estimated_grams, Some(15.0));
    }

    #[test]
    fn test_enrich_empty_analysis() {
        let analysis = ImageAnalysis {
            detected_foods: vec![DetectedFood {
                name: "   ".into(),
                confidence: 0.2,
                bounding_box: None,
            }],
            ..Default::default()
        };
        let (foods, unrecognized) = enrich_detections(&analysis, &sample_reference_data());
        assert!(foods.is_empty());
        assert_eq!(unrecognized.len(), 1);
    }
}
