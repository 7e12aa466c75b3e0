use std::time::Duration;
use thiserror::Error;

/// Failures raised inside a checker run.
///
/// These never reach callers of [`crate::Checker::check_text`]; they are
/// converted into a single `error`-kind correction at the checker boundary.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("no language model is configured")]
    ModelUnavailable,

    #[error("language model error: {0}")]
    Model(String),

    #[error("invalid rule `{id}`: {source}")]
    Rule {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

impl CheckError {
    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }
}
