use axum::{extract::State, http::StatusCode, Json};

use crate::dto::{HealthResponse, ReadyResponse};
use crate::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "nutrivision-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready once the database answers and the reference tables are loaded.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    let reference = state.reference.snapshot().await;
    let ready = db_ok && !reference.is_empty();

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" },
            database: if db_ok { "ok" } else { "failed" },
            reference_foods: reference.foods.len(),
            reference_glycemic: reference.glycemic.len(),
        }),
    )
}
