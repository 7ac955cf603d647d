use thiserror::Error;

/// Error taxonomy for the rule engine.
///
/// `Io`/`Parse`/`DataLoad` are fatal at startup; the rest are per-request
/// conditions surfaced to the caller layer.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Data load failed: {0}")]
    DataLoad(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid override for parameter '{param}': expected {expected}")]
    InvalidOverride {
        param: String,
        expected: &'static str,
    },
}

impl EngineError {
    /// Whether this error means a requested record/rule does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::RuleNotFound(_) | EngineError::TransactionNotFound(_)
        )
    }
}
