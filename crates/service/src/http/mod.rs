//! Router, CORS policy and request plumbing.

mod error;
mod handlers;

pub use error::ApiError;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("ngrok-skip-browser-warning"),
        ]);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/compare", post(handlers::compare))
        .route("/leaderboard/:quest_id/get", post(handlers::leaderboard_get))
        .route("/leaderboard/:quest_id/add", post(handlers::leaderboard_add))
        .route(
            "/leaderboard/:quest_id",
            get(handlers::leaderboard_get).post(handlers::leaderboard_add),
        )
        .route("/api/submit-quest", post(handlers::submit_quest))
        .route("/api/quests", get(handlers::list_quests))
        .route("/api/quests/:quest_id", get(handlers::get_quest))
        .route("/quest/:quest_id/rate", post(handlers::rate_quest))
        .route("/api/submitted-quests", get(handlers::submitted_quests))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
