use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::axis::Axis;

/// Errors raised by the engine. All of them are local validation failures:
/// retrying with the same input reproduces the same error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// An axis value is non-finite or could not be coerced to a number.
    #[error("invalid score for axis {axis}: {reason}")]
    InvalidScore { axis: Axis, reason: String },
    /// A flag outside the closed vocabulary was set (strict policy only).
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),
    /// Catalog lookup miss.
    #[error("unknown pattern '{0}'")]
    UnknownPattern(String),
    /// A rule set failed validation.
    #[error("invalid rule set: {0}")]
    InvalidRuleSet(String),
}

impl EngineError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidScore { .. } => codes::INVALID_SCORE,
            EngineError::UnknownFlag(_) => codes::UNKNOWN_FLAG,
            EngineError::UnknownPattern(_) => codes::UNKNOWN_PATTERN,
            EngineError::InvalidRuleSet(_) => codes::INVALID_RULE_SET,
        }
    }
}

/// Structured error report for the calling layer, which turns it
/// into a user-visible fallback.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorReport {
    /// Machine-readable error code (e.g. "invalid_score", "unknown_flag")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Which input field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Hint about what the correct input looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl From<&EngineError> for ErrorReport {
    fn from(err: &EngineError) -> Self {
        let (field, received, docs_hint) = match err {
            EngineError::InvalidScore { axis, .. } => (
                Some(format!("scores.{axis}")),
                None,
                Some("Scores must be finite numbers (or numeric strings) between 0 and 5.".to_string()),
            ),
            EngineError::UnknownFlag(name) => (
                Some(format!("flags.{name}")),
                Some(serde_json::Value::Bool(true)),
                Some("Use a flag from the closed vocabulary or run with the lenient flag policy.".to_string()),
            ),
            EngineError::UnknownPattern(id) => (
                Some("pattern_id".to_string()),
                Some(serde_json::Value::String(id.clone())),
                Some("Pattern ids run from P01 to P12.".to_string()),
            ),
            EngineError::InvalidRuleSet(_) => (
                None,
                None,
                Some("Start from `kotaro rules show` and edit the dumped rule set.".to_string()),
            ),
        };

        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            field,
            received,
            docs_hint,
        }
    }
}

/// Error codes used across the engine
pub mod codes {
    pub const INVALID_SCORE: &str = "invalid_score";
    pub const UNKNOWN_FLAG: &str = "unknown_flag";
    pub const UNKNOWN_PATTERN: &str = "unknown_pattern";
    pub const INVALID_RULE_SET: &str = "invalid_rule_set";
}
