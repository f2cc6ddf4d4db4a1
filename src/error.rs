// ⚠️ Error types - governance boundary and storage failures
//
// The engines themselves never fail: missing input is an empty list and
// malformed fields are empty strings. Errors only appear where tables are
// written or persisted state is read back.

use thiserror::Error;

/// Result type for governance, workflow and storage operations
pub type Result<T> = std::result::Result<T, HarmonizeError>;

#[derive(Error, Debug)]
pub enum HarmonizeError {
    /// confidence_threshold outside [0, 100]
    #[error("confidence_threshold must be between 0 and 100 (got {0})")]
    InvalidThreshold(i64),

    /// name/address weight negative or not a finite number
    #[error("invalid {field} weight: {value}")]
    InvalidWeight { field: &'static str, value: f64 },

    /// name_weight + address_weight above 1, which would push a blended
    /// confidence past 100
    #[error("name_weight + address_weight must not exceed 1.0 (got {0})")]
    InvalidWeightSum(f64),

    /// Manual merge or override rule that cannot be stored
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    /// Workflow state change that the state machine forbids
    #[error("cannot transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A writer panicked while holding the table lock
    #[error("governance tables unavailable: lock poisoned")]
    LockPoisoned,
}
