use thiserror::Error;

/// A record description or index declaration that cannot form a valid model.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid model definition: {0}")]
pub struct ModelDefinitionError(pub String);

impl ModelDefinitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by data-access operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error(transparent)]
    ModelDefinition(#[from] ModelDefinitionError),
    /// Malformed or unsupported request shape. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Condition failed: {0}")]
    ConditionFailed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Encryption not configured: {0}")]
    EncryptionNotConfigured(String),
    /// Per-item reason codes, positionally aligned with the submitted actions.
    #[error("Transaction canceled: [{}]", .reasons.join(", "))]
    TransactionCanceled { reasons: Vec<String> },
    #[error("{operation} retry budget exhausted with {unprocessed} unprocessed items")]
    BatchRetryExceeded {
        operation: String,
        unprocessed: usize,
    },
    #[error("Remote store error {code}: {message}")]
    RemoteStore { code: String, message: String },
    #[error("Key wrapping failed {code}: {message}")]
    KeyWrapping { code: String, message: String },
}

impl AccessError {
    pub fn validation(message: impl Into<String>) -> Self {
        AccessError::Validation(message.into())
    }

    /// Whether a retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AccessError::ModelDefinition(_)
                | AccessError::Validation(_)
                | AccessError::EncryptionNotConfigured(_)
        )
    }
}

/// Result type for data-access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
