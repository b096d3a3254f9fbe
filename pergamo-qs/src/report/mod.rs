//! Question reports
//!
//! A report passes the per-client rate limit, is deduplicated per question
//! and client, and then notifies moderators. Notification failures are
//! logged only; the report itself has already been recorded.

pub mod notifier;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::limits::ClientRateLimiter;

pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use store::{MemoryReportStore, ReportStore};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Too many reports")]
    RateLimited,

    #[error("Invalid report payload: {0}")]
    InvalidPayload(String),

    #[error("Report store error: {0}")]
    Store(String),

    #[error("Notification failed: {0}")]
    Notify(String),
}

/// A JSON value sent either as a number or as a string
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Report body as received
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub question_id: Option<Scalar>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub year: Option<Scalar>,
    #[serde(default)]
    pub index: Option<Scalar>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A validated report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReport {
    pub question_id: String,
    pub subject: String,
    pub year: String,
    pub index: String,
    pub reason: String,
}

impl TryFrom<ReportRequest> for QuestionReport {
    type Error = ReportError;

    fn try_from(request: ReportRequest) -> Result<Self, Self::Error> {
        let question_id = request
            .question_id
            .map(|id| id.to_string())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ReportError::InvalidPayload("questionId is required".to_string()))?;
        let reason = request
            .reason
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| ReportError::InvalidPayload("reason is required".to_string()))?;

        Ok(Self {
            question_id: question_id.trim().to_string(),
            subject: request.subject.unwrap_or_default(),
            year: request.year.map(|y| y.to_string()).unwrap_or_default(),
            index: request.index.map(|i| i.to_string()).unwrap_or_default(),
            reason: reason.trim().to_string(),
        })
    }
}

/// Response body of a report submission
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_reported: Option<bool>,
}

pub struct ReportService {
    store: Arc<dyn ReportStore>,
    notifier: Arc<dyn Notifier>,
    limiter: ClientRateLimiter,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        notifier: Arc<dyn Notifier>,
        requests_per_minute: u32,
    ) -> Self {
        Self {
            store,
            notifier,
            limiter: ClientRateLimiter::per_minute(requests_per_minute),
        }
    }

    /// In-memory store with the given TTL, webhook when a URL is configured
    pub fn from_config(
        webhook_url: Option<&str>,
        requests_per_minute: u32,
        dedup_ttl: Duration,
    ) -> Result<Self, ReportError> {
        let notifier: Arc<dyn Notifier> = match webhook_url {
            Some(url) => Arc::new(WebhookNotifier::new(url)?),
            None => {
                warn!("No report webhook configured; reports will only be logged");
                Arc::new(LogNotifier)
            }
        };
        Ok(Self::new(
            Arc::new(MemoryReportStore::new(dedup_ttl)),
            notifier,
            requests_per_minute,
        ))
    }

    /// Drop rate limiter state for clients that are back to a full quota
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub async fn submit(
        &self,
        client: &str,
        request: ReportRequest,
    ) -> Result<ReportOutcome, ReportError> {
        if !self.limiter.check(client) {
            warn!("Report rate limit hit for client {}", client);
            return Err(ReportError::RateLimited);
        }

        let report = QuestionReport::try_from(request)?;
        let key = format!("reported:{}", report.question_id);

        if !self.store.record(&key, client).await? {
            info!("Question {} already reported by {}", report.question_id, client);
            return Ok(ReportOutcome {
                success: true,
                already_reported: Some(true),
            });
        }

        if let Err(e) = self.notifier.notify(&report).await {
            warn!("Report for {} recorded but not delivered: {}", report.question_id, e);
        }

        Ok(ReportOutcome {
            success: true,
            already_reported: None,
        })
    }
}
