//! Question lookup, pagination and listing endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::feed::{PageRequest, QuestionPage, DEFAULT_LIMIT};
use crate::models::Question;
use crate::AppState;

const NOT_FOUND_MESSAGE: &str = "Nenhuma questão encontrada";

/// GET /questions/:subject
///
/// Full canonically ordered set; 404 when nothing matches.
pub async fn questions_by_subject(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Vec<Arc<Question>>>> {
    let Path(subject) = path?;
    let set = state.questions.subject_set(&subject).await;
    if set.is_empty() {
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()));
    }
    debug!("Serving {} questions for '{}'", set.len(), subject);
    Ok(Json(set.to_vec()))
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    #[serde(default)]
    pub random: Option<String>,
}

/// GET /questions/:subject/:year
///
/// `?random=true` returns a single question instead of the list.
pub async fn questions_by_year(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<YearQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Path((subject, year)) = path?;
    let Query(query) = query?;
    let year: u16 = year
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("Ano inválido".to_string()))?;

    if query.random.as_deref() == Some("true") {
        return match state.questions.random_by_year(&subject, year).await {
            Some(question) => Ok(Json(question).into_response()),
            None => Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())),
        };
    }

    let questions = state.questions.by_year(&subject, year).await;
    if questions.is_empty() {
        return Err(ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()));
    }
    Ok(Json(questions).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub subjects: Option<Vec<String>>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn page_request(offset: Option<usize>, limit: Option<usize>) -> ApiResult<PageRequest> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit deve ser maior que zero".to_string()));
    }
    Ok(PageRequest {
        offset: offset.unwrap_or(0),
        limit,
    })
}

/// POST /questions/batch
///
/// One page per requested subject, keyed by subject token.
pub async fn questions_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<Json<BTreeMap<String, QuestionPage>>> {
    let Json(request) = payload?;
    let subjects = request
        .subjects
        .ok_or_else(|| ApiError::BadRequest("subjects deve ser um array".to_string()))?;
    let page = page_request(request.offset, request.limit)?;

    Ok(Json(state.questions.batch(&subjects, page).await))
}

#[derive(Debug, Deserialize)]
pub struct FeedRequest {
    pub subject: String,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// POST /questions/feed
///
/// One page of a composite feed such as `ciencias-humanas` or
/// `linguagens+ingles`.
pub async fn questions_feed(
    State(state): State<AppState>,
    payload: Result<Json<FeedRequest>, JsonRejection>,
) -> ApiResult<Json<QuestionPage>> {
    let Json(request) = payload?;
    let page = page_request(request.offset, request.limit)?;
    Ok(Json(state.questions.composite_page(&request.subject, page).await))
}

/// GET /questions/disciplines
pub async fn list_disciplines(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.questions.disciplines().await)
}

/// GET /questions/years
pub async fn list_years(State(state): State<AppState>) -> Json<Vec<u16>> {
    Json(state.questions.years().await)
}

/// GET /questions/areas
pub async fn list_areas(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.questions.areas().await)
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub loaded: usize,
    pub skipped: usize,
}

/// POST /questions/reload
///
/// Rescan the question root and drop every cached set. Disabled unless
/// `store.allow_reload` is set.
pub async fn reload_questions(State(state): State<AppState>) -> ApiResult<Json<ReloadResponse>> {
    if !state.allow_reload {
        return Err(ApiError::Forbidden("Recarregamento desabilitado".to_string()));
    }
    let report = state.questions.reload().await?;
    info!("Reload requested: {} questions loaded", report.loaded);
    Ok(Json(ReloadResponse {
        loaded: report.loaded,
        skipped: report.skipped,
    }))
}
