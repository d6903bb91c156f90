//! Tax research routes, mounted under /api/openai-search

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};

use super::chat::{AnswerResponse, QuestionRequest};
use crate::advisor::CannedQuestion;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query))
        .route("/filing-deadlines", get(filing_deadlines))
        .route("/latest-updates", get(latest_updates))
        .route("/tax-brackets", get(tax_brackets))
        .route("/standard-deduction", get(standard_deduction))
}

async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QuestionRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>> {
    let Json(request) = payload?;
    let question = request
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Question is required".to_string()))?;

    let answer = state.advisor().query(&question).await;
    Ok(Json(AnswerResponse { answer }))
}

async fn canned(state: &AppState, question: CannedQuestion) -> Json<AnswerResponse> {
    Json(AnswerResponse {
        answer: state.advisor().canned(question).await,
    })
}

async fn filing_deadlines(State(state): State<AppState>) -> Json<AnswerResponse> {
    canned(&state, CannedQuestion::FilingDeadlines).await
}

async fn latest_updates(State(state): State<AppState>) -> Json<AnswerResponse> {
    canned(&state, CannedQuestion::LatestUpdates).await
}

async fn tax_brackets(State(state): State<AppState>) -> Json<AnswerResponse> {
    canned(&state, CannedQuestion::TaxBrackets).await
}

async fn standard_deduction(State(state): State<AppState>) -> Json<AnswerResponse> {
    canned(&state, CannedQuestion::StandardDeduction).await
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use super::super::test_support::{server, state};
    use crate::advisor::OFF_TOPIC_REPLY;
    use crate::model::mock::ScriptedModel;

    #[tokio::test]
    async fn test_query_route() {
        let model = ScriptedModel::with_replies(["YES", "Brackets are..."]);
        let server = server(state(model.clone()));

        let body: Value = server
            .post("/api/openai-search/query")
            .json(&json!({ "question": "What are the brackets?" }))
            .await
            .json();
        assert_eq!(body["answer"], "Brackets are...");
        assert_eq!(
            model.requests()[1].model.as_deref(),
            Some("gpt-4o-search-preview")
        );
    }

    #[tokio::test]
    async fn test_off_topic_and_missing_question() {
        let server = server(state(ScriptedModel::with_replies(["NO"])));

        let body: Value = server
            .post("/api/openai-search/query")
            .json(&json!({ "question": "Who won the game?" }))
            .await
            .json();
        assert_eq!(body["answer"], OFF_TOPIC_REPLY);

        server
            .post("/api/openai-search/query")
            .json(&json!({}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_canned_routes() {
        let model = ScriptedModel::with_replies(["a", "b", "c", "d"]);
        let server = server(state(model.clone()));

        for path in [
            "/api/openai-search/filing-deadlines",
            "/api/openai-search/latest-updates",
            "/api/openai-search/tax-brackets",
            "/api/openai-search/standard-deduction",
        ] {
            server.get(path).await.assert_status_ok();
        }

        let requests = model.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.web_search));
        assert!(requests[3]
            .last_content()
            .unwrap()
            .contains("standard deduction amount for tax year 2025"));
    }
}
