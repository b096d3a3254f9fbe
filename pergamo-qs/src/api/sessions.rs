//! Practice session endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::feed::{CompositeFeed, OrderPolicy, QuestionPage, DEFAULT_LIMIT};
use crate::session::{AnswerResult, SessionSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub subjects: Vec<String>,
    #[serde(default)]
    pub balanced: bool,
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionSummary>)> {
    let Json(request) = payload?;
    let feed = CompositeFeed::from_subjects(&request.subjects);
    if feed.constituents.is_empty() {
        return Err(ApiError::BadRequest(
            "Selecione pelo menos uma matéria".to_string(),
        ));
    }

    let combined = state.questions.combined(&feed).await;
    let policy = if request.balanced {
        OrderPolicy::BalancedByYear
    } else {
        OrderPolicy::Shuffled
    };

    let subjects = feed.token.split(',').map(str::to_string).collect();
    let summary = state
        .sessions
        .create(subjects, combined.weighted(), policy)
        .await;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<SessionSummary>> {
    let Path(id) = path?;
    Ok(Json(state.sessions.summary(id).await?))
}

/// DELETE /sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /sessions/:id/next
pub async fn next_questions(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<NextQuery>, QueryRejection>,
) -> ApiResult<Json<QuestionPage>> {
    let Path(id) = path?;
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit deve ser maior que zero".to_string()));
    }
    Ok(Json(state.sessions.next_page(id, limit).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub question_id: String,
    pub answer: String,
}

/// POST /sessions/:id/answer
pub async fn answer_question(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> ApiResult<Json<AnswerResult>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    let result = state
        .sessions
        .answer(id, &request.question_id, &request.answer)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipRequest {
    pub question_id: String,
}

/// POST /sessions/:id/skip
pub async fn skip_question(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SkipRequest>, JsonRejection>,
) -> ApiResult<Json<SessionSummary>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    state.sessions.skip(id, &request.question_id).await?;
    Ok(Json(state.sessions.summary(id).await?))
}

/// POST /sessions/:id/restart
pub async fn restart_session(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<SessionSummary>> {
    let Path(id) = path?;
    Ok(Json(state.sessions.restart(id).await?))
}
