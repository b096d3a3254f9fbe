//! Question report endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use super::client::client_id;
use crate::error::{ApiError, ApiResult};
use crate::report::{ReportOutcome, ReportRequest};
use crate::AppState;

/// POST /report-question
pub async fn report_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> ApiResult<Json<ReportOutcome>> {
    let Json(request) =
        payload.map_err(|_| ApiError::BadRequest("Payload inválido".to_string()))?;
    let client = client_id(&headers);
    Ok(Json(state.reports.submit(&client, request).await?))
}
