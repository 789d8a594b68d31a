use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};

use crate::auth::middleware::AuthUser;
use crate::dto::{DailySummaryQuery, DailySummaryResponse, Remaining};
use crate::error::{AppError, AppResult};
use crate::models::meal::{FoodItem, MealLog, MealTotals};
use crate::models::profile::CalculatedMetrics;
use crate::models::user::User;
use crate::services::glycemic::{aggregate_meal_totals, round1};
use crate::AppState;

/// UTC bounds of a local calendar day, `[start, end)`.
fn day_bounds(date: NaiveDate, offset: FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()?
        .with_timezone(&Utc);
    Some((start, start + Duration::days(1)))
}

fn remaining(targets: &CalculatedMetrics, consumed: &MealTotals) -> Remaining {
    Remaining {
        calories: f64::from(targets.daily_calorie_target) - consumed.calories,
        protein: round1(f64::from(targets.macro_targets.protein) - consumed.protein),
        carbs: round1(f64::from(targets.macro_targets.carbs) - consumed.carbs),
        fat: round1(f64::from(targets.macro_targets.fat) - consumed.fat),
    }
}

/// GET /api/summary/daily
pub async fn daily_summary(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<DailySummaryQuery>,
) -> AppResult<Json<DailySummaryResponse>> {
    let offset_minutes = query.tz_offset_minutes.unwrap_or(0);
    if !(-720..=840).contains(&offset_minutes) {
        return Err(AppError::Validation("tz_offset_minutes must be -720..840".into()));
    }
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .ok_or_else(|| AppError::Validation("Invalid timezone offset".into()))?;

    let date = query
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
    let (start, end) = day_bounds(date, offset)
        .ok_or_else(|| AppError::Validation("Invalid date".into()))?;

    let meals = sqlx::query_as::<_, MealLog>(
        r#"
        SELECT * FROM meal_logs
        WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
        ORDER BY eaten_at ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let user = User::fetch(&state.db, auth_user.id).await?;
    let targets = user.calculated_metrics();

    // aggregate over every food of the day so average_gi weighs foods, not meals
    let foods: Vec<FoodItem> = meals.iter().flat_map(|m| m.foods.0.iter().cloned()).collect();
    let consumed = aggregate_meal_totals(&foods);

    Ok(Json(DailySummaryResponse {
        date,
        meal_count: meals.len(),
        remaining: targets.as_ref().map(|t| remaining(t, &consumed)),
        consumed,
        targets,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::MacroTargets;

    #[test]
    fn test_day_bounds_with_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(date, FixedOffset::west_opt(5 * 3600).unwrap()).unwrap();
        assert_eq!(start.to_rfc3339(), "2026-03-01T05:00:00+00:00");
        assert_eq!(end - start, Duration::hours(24));

        let (utc_start, _) = day_bounds(date, FixedOffset::east_opt(0).unwrap()).unwrap();
        assert_eq!(utc_start.to_rfc3339(), "2026-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_remaining_can_go_negative() {
        let targets = CalculatedMetrics {
            bmr: 1649,
            tdee: 1979,
            daily_calorie_target: 1479,
            macro_targets: MacroTargets { protein: 148, carbs: 111, fat: 49 },
        };
        let consumed = MealTotals {
            calories: 1600.0,
            protein: 90.5,
            carbs: 111.0,
            fat: 20.2,
            ..Default::default()
        };
        assert_eq!(
            remaining(&targets, &consumed),
            Remaining { calories: -121.0, protein: 57.5, carbs: 0.0, fat: 28.8 }
        );
    }
}
