//! HTTP routes
//!
//! - `health`: liveness probe
//! - `upload`: document upload and spreadsheet download
//! - `chat`: document-grounded and general conversations
//! - `advisor`: tax research queries

pub mod advisor;
pub mod chat;
pub mod health;
pub mod upload;

use axum::extract::rejection::JsonRejection;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// The complete application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(upload::router(state.config().limits.max_request_bytes))
        .merge(chat::router())
        .nest("/api/openai-search", advisor::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
