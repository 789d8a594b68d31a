use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod db;
mod dto;
mod error;
mod handlers;
mod models;
mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use services::ai_client::AiClient;
use services::reference::{ReferenceCache, ReferenceData};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
    pub reference: ReferenceCache,
    pub ai: AiClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutrivision_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let reference_data = ReferenceData::load(&db)
        .await
        .context("Failed to load reference data")?;
    tracing::info!(
        foods = reference_data.foods.len(),
        glycemic = reference_data.glycemic.len(),
        "Reference data loaded"
    );
    let reference = ReferenceCache::new(reference_data);

    let ai = AiClient::new(&config.ai_service_url, Duration::from_secs(config.ai_timeout_secs))?;

    let state = AppState {
        db: db.clone(),
        config: config.clone(),
        rate_limiter: RateLimitState::new(),
        reference: reference.clone(),
        ai,
    };

    services::reference::spawn_reference_refresh_worker(
        reference,
        db,
        Duration::from_secs(config.reference_refresh_secs),
    );
    auth::rate_limit::spawn_rate_limit_cleanup(state.rate_limiter.clone());

    let app = build_router(state)?;

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    // connect info feeds the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let analyze_route = Router::new()
        .route("/api/analyze/image", post(handlers::analysis::analyze_image))
        .layer(DefaultBodyLimit::max(state.config.max_image_size));

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::auth::me))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Profile
        .route("/api/profile/physical", put(handlers::profile::update_physical))
        .route("/api/profile/goals", put(handlers::profile::update_goals))
        .route("/api/profile/dietary", put(handlers::profile::update_dietary))
        .route("/api/profile/metrics", get(handlers::profile::get_metrics))
        // Meals
        .route(
            "/api/meals",
            post(handlers::meals::create_meal).get(handlers::meals::list_meals),
        )
        .route(
            "/api/meals/:id",
            get(handlers::meals::get_meal)
                .put(handlers::meals::update_meal)
                .delete(handlers::meals::delete_meal),
        )
        .route("/api/meals/:id/foods", post(handlers::meals::add_food))
        .route(
            "/api/meals/:id/foods/:index",
            axum::routing::delete(handlers::meals::remove_food),
        )
        // Analysis & reference
        .merge(analyze_route)
        .route("/api/reference/foods/:name", get(handlers::reference::lookup_food))
        .route("/api/summary/daily", get(handlers::summary::daily_summary))
        // AI
        .route("/api/ai/chat", post(handlers::ai::chat))
        .route("/api/ai/quick-query", post(handlers::ai::quick_query))
        .route("/api/ai/quick-meal", post(handlers::ai::quick_meal))
        // Plans
        .route("/api/plans/meal", post(handlers::plans::generate_meal_plan))
        .route("/api/plans/workout", post(handlers::plans::generate_workout_plan))
        .route("/api/plans", get(handlers::plans::list_plans))
        .route("/api/plans/:id", get(handlers::plans::get_plan))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let mut origins = vec![state
        .config
        .frontend_url
        .parse::<HeaderValue>()
        .context("FRONTEND_URL is not a valid origin")?];
    for extra in &state.config.cors_extra_origins {
        match extra.parse::<HeaderValue>() {
            Ok(origin) => origins.push(origin),
            Err(_) => tracing::warn!(origin = %extra, "Ignoring invalid CORS origin"),
        }
    }
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
