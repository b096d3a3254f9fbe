//! Wrong-answer explanations streamed from a language model

pub mod client;
pub mod prompt;
pub mod upstream;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

pub use client::LlmClient;
pub use prompt::build_prompt;

/// Stream of text chunks produced by a provider
pub type TextStream = BoxStream<'static, String>;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("Question or user answer missing")]
    MissingInput,

    #[error("Alternative {0:?} not found in question")]
    UnknownAlternative(String),

    #[error("Question has no correct alternative")]
    MissingCorrectAlternative,

    #[error("Explanation service is not configured")]
    NotConfigured,

    #[error("Explanation rate limit exceeded")]
    RateLimited,

    #[error("Upstream returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Upstream transport error: {0}")]
    Transport(String),
}

/// Source of streamed explanations
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    /// Start streaming the completion for `prompt`
    ///
    /// Errors are returned before any chunk is produced, so callers can still
    /// answer with a plain JSON error.
    async fn explain(&self, prompt: String) -> Result<TextStream, ExplainError>;
}
