//! HTTP error type for pergamo-qs

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::explain::ExplainError;
use crate::report::ReportError;
use crate::service::ServiceError;
use crate::session::SessionError;

/// Message returned for rate-limited requests
pub const RATE_LIMIT_MESSAGE: &str =
    "Muitas solicitações. Aguarde alguns segundos e tente novamente.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400
    #[error("{0}")]
    BadRequest(String),

    /// 403
    #[error("{0}")]
    Forbidden(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 409
    #[error("{0}")]
    Conflict(String),

    /// 429
    #[error("{0}")]
    RateLimited(String),

    /// 503
    #[error("{0}")]
    Unavailable(String),

    /// 500 with a caller-facing message; detail already logged
    #[error("{0}")]
    Upstream(String),

    /// 500
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            ApiError::RateLimited(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "RATE_LIMIT", "message": msg }),
            ),
            ApiError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg }))
            }
            ApiError::Upstream(msg) | ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ExplainError> for ApiError {
    fn from(err: ExplainError) -> Self {
        match err {
            ExplainError::MissingInput => {
                ApiError::BadRequest("Questão ou resposta do usuário não fornecida".to_string())
            }
            ExplainError::UnknownAlternative(_) | ExplainError::MissingCorrectAlternative => {
                ApiError::BadRequest("Alternativas não encontradas".to_string())
            }
            ExplainError::NotConfigured => ApiError::Unavailable(
                "Serviço de explicação temporariamente indisponível.".to_string(),
            ),
            ExplainError::RateLimited => ApiError::RateLimited(RATE_LIMIT_MESSAGE.to_string()),
            ExplainError::Upstream { .. } | ExplainError::Transport(_) => ApiError::Upstream(
                "Erro ao gerar explicação. Tente novamente em alguns instantes.".to_string(),
            ),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::RateLimited => {
                ApiError::RateLimited("Muitas requisições, tente mais tarde.".to_string())
            }
            ReportError::InvalidPayload(_) => ApiError::BadRequest("Payload inválido".to_string()),
            ReportError::Store(detail) | ReportError::Notify(detail) => {
                error!("Report failed: {}", detail);
                ApiError::Internal("Erro ao enviar o report".to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) | SessionError::NotServed(_) => {
                ApiError::NotFound(err.to_string())
            }
            SessionError::AlreadyAnswered(_) => ApiError::Conflict(err.to_string()),
            SessionError::InvalidLetter(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NoLoader => ApiError::Conflict(err.to_string()),
            ServiceError::LoadTask(_) => {
                error!("Reload failed: {}", err);
                ApiError::Internal("Erro ao carregar questões".to_string())
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
