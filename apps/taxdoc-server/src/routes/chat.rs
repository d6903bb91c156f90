//! Chat Routes
//!
//! Endpoints:
//! - POST /analyze - Chat about a recipient's documents
//! - GET /summary/:employee_name - Intake narrative for a recipient
//! - GET /chat/history/:employee_name - Turns recorded for a recipient
//! - DELETE /chat/history/:employee_name - Forget a recipient's conversation
//! - POST /chat/general - Chat without documents
//! - GET /chat/general/summary - Intake narrative of the general chat
//! - DELETE /chat/general/history - Forget the general chat

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::session::Turn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default, alias = "recipientIdentifier")]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub recipient: String,
    pub history: Vec<Turn>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/summary/:employee_name", get(summary))
        .route(
            "/chat/history/:employee_name",
            get(history).delete(clear_history),
        )
        .route("/chat/general", post(general_chat))
        .route("/chat/general/summary", get(general_summary))
        .route(
            "/chat/general/history",
            axum::routing::delete(clear_general_history),
        )
}

/// POST /analyze
///
/// Both fields must be present; a blank or `undefined` name selects the
/// most recently uploaded recipient.
async fn analyze(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>> {
    let Json(request) = payload?;
    let (Some(name), Some(question)) = (request.employee_name, request.question) else {
        return Err(AppError::Validation(
            "Employee name and question are required".to_string(),
        ));
    };

    let answer = state.documents().chat(Some(name.as_str()), &question).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn summary(
    State(state): State<AppState>,
    Path(employee_name): Path<String>,
) -> Result<Json<SummaryResponse>> {
    let summary = state.documents().summary(Some(employee_name.as_str())).await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn history(
    State(state): State<AppState>,
    Path(employee_name): Path<String>,
) -> Json<HistoryResponse> {
    let (recipient, history) = state
        .documents()
        .history(Some(employee_name.as_str()))
        .await
        .unwrap_or((employee_name, Vec::new()));
    Json(HistoryResponse { recipient, history })
}

async fn clear_history(
    State(state): State<AppState>,
    Path(employee_name): Path<String>,
) -> StatusCode {
    state.documents().clear_history(Some(employee_name.as_str())).await;
    StatusCode::NO_CONTENT
}

async fn general_chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>> {
    let Json(request) = payload?;
    let question = request
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Question is required".to_string()))?;

    let answer = state.documents().general_chat(&question).await?;
    Ok(Json(AnswerResponse { answer }))
}

async fn general_summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>> {
    let summary = state.documents().general_summary().await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn clear_general_history(State(state): State<AppState>) -> StatusCode {
    state.documents().clear_general_history();
    StatusCode::NO_CONTENT
}
