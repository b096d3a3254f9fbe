//! Explanation streaming endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::client::client_id;
use crate::error::{ApiError, ApiResult, RATE_LIMIT_MESSAGE};
use crate::explain::{build_prompt, ExplainError};
use crate::models::Question;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    #[serde(default)]
    pub question: Option<Question>,
    #[serde(default)]
    pub user_answer: Option<String>,
}

/// POST /explain
///
/// Streams `data: {"content": "..."}` events. Validation and upstream
/// failures are reported as JSON before the stream starts.
pub async fn explain(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ExplainRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let (Some(question), Some(user_answer)) = (request.question, request.user_answer) else {
        return Err(ExplainError::MissingInput.into());
    };

    let prompt = build_prompt(&question, &user_answer)?;

    // Only well-formed requests count against the client's quota
    let client = client_id(&headers);
    if !state.explain_limiter.check(&client) {
        warn!("Explanation rate limit hit for client {}", client);
        return Err(ApiError::RateLimited(RATE_LIMIT_MESSAGE.to_string()));
    }

    let chunks = state.explainer.explain(prompt).await?;
    info!("Streaming explanation for question {}", question.id());

    Ok(pergamo_common::sse::text_sse_stream("explain", chunks).into_response())
}
