use thiserror::Error;

/// Single error enum for all policy engine operations.
///
/// Resolution failures are configuration errors, not transient faults: they
/// are never retried and never downgraded to a deny/permit decision. Callers
/// must treat any error as "decision could not be computed" and pick their
/// own fail-safe behavior.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("strategy reference '{reference}' could not be resolved")]
    StrategyResolution { reference: String },

    #[error("strategy reference '{reference}' resolved to a value that is neither a boolean nor callable")]
    StrategyNotCallable { reference: String },

    #[error("invalid pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("policy validation error: {0}")]
    Validation(String),

    #[error("policy load error: {0}")]
    Load(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
