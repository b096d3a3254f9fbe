//! Moderation notifications for reported questions

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

use super::{QuestionReport, ReportError};

/// Embed colors, picked at random per report
const YELLOW_TONES: [u32; 15] = [
    0xFFF9C4, 0xFFF59D, 0xFFF176, 0xFFEE58, 0xFFEB3B, 0xFDD835, 0xFBC02D, 0xF9A825, 0xF57F17,
    0xFFC107, 0xFFB300, 0xFFA000, 0xFF8F00, 0xFF6F00, 0xFFD600,
];

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &QuestionReport) -> Result<(), ReportError>;
}

/// Posts a chat embed to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ReportError::Notify(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, report: &QuestionReport) -> Result<(), ReportError> {
        let color = *YELLOW_TONES
            .choose(&mut rand::thread_rng())
            .unwrap_or(&YELLOW_TONES[0]);
        let payload = webhook_payload(report, color);

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReportError::Notify(format!(
                "webhook responded {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Used when no webhook is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &QuestionReport) -> Result<(), ReportError> {
        warn!(
            "No report webhook configured; question {} reported: {}",
            report.question_id, report.reason
        );
        Ok(())
    }
}

/// Webhook body for one report
pub fn webhook_payload(report: &QuestionReport, color: u32) -> Value {
    info!("Notifying moderators about question {}", report.question_id);
    json!({
        "username": "Pergamo | ReportBot |",
        "embeds": [{
            "title": "🚨 Questão reportada!",
            "color": color,
            "fields": [
                { "name": "Ano", "value": report.year, "inline": true },
                { "name": "Número", "value": report.index, "inline": true },
                { "name": "Matéria", "value": capitalize(&report.subject) },
                { "name": "Problema", "value": report.reason },
            ],
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }]
    })
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
