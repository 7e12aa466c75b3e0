pub mod aggregator;
pub mod checker;
pub mod cli;
pub mod config;
pub mod error;

pub use aggregator::{score, Aggregator, Comparison, PerformanceScore};
pub use checker::{Checker, RuleBasedChecker};
pub use config::Config;
pub use error::CheckError;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous run of text cut out of a larger input.
///
/// `start` and `end` are byte offsets, so `&input[start..end] == text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionKind {
    Spelling,
    Grammar,
    Error,
}

impl fmt::Display for CorrectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionKind::Spelling => write!(f, "spelling"),
            CorrectionKind::Grammar => write!(f, "grammar"),
            CorrectionKind::Error => write!(f, "error"),
        }
    }
}

/// One detected issue, optionally carrying the text that should replace
/// `context`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub kind: CorrectionKind,
    pub message: String,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl Correction {
    pub fn new(kind: CorrectionKind, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: context.into(),
            replacement: None,
        }
    }

    pub fn spelling(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::new(CorrectionKind::Spelling, message, context)
    }

    pub fn grammar(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::new(CorrectionKind::Grammar, message, context)
    }

    pub fn error(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::new(CorrectionKind::Error, message, context)
    }

    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }

    /// Advisory corrections are reported but never applied to the text.
    pub fn is_advisory(&self) -> bool {
        self.replacement.is_none()
    }
}

/// Output of one checker run over one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub corrections: Vec<Correction>,
    pub corrected_text: String,
}
