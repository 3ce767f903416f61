//! Server for a uniform-price call-auction market experiment.
//!
//! Four participants with fixed roles submit sealed order sets each round;
//! when the last set arrives the round clears in one batch at a single
//! uniform price, settlement is computed against two-tier marginal values
//! and persisted atomically, and the next round opens.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod services;

pub use config::Config;
pub use error::{ApiError, Result};

use database::repository::SqliteStore;
use services::RoundCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: database::DatabasePool,
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub coordinator: Arc<RoundCoordinator>,
}

/// Build the full application router, including API docs and the
/// middleware stack. Used by `main` and by the integration tests.
pub fn app(state: AppState) -> Router {
    let auction_routes = Router::new()
        .route("/register", post(handlers::registration::register))
        .route("/survey", post(handlers::registration::submit_survey))
        .route("/orders", post(handlers::auction::submit_orders))
        .route(
            "/rounds/{round_number}/result",
            get(handlers::auction::get_round_result),
        )
        .route(
            "/participants/{participant_id}",
            get(handlers::auction::get_participant_info),
        )
        .route(
            "/participants/{participant_id}/tokens",
            get(handlers::auction::get_token_balance),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/auction", auction_routes)
        .merge(
            SwaggerUi::new("/api/docs")
                .url("/api/docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
