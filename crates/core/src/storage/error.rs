use thiserror::Error;

use crate::error::AccessError;

pub const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";
pub const VALIDATION: &str = "ValidationException";
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
pub const TRANSACTION_CANCELED: &str = "TransactionCanceledException";

/// Failure reported by the remote store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct StoreFailure {
    pub code: String,
    pub message: String,
    /// Per-action reason codes of a canceled transaction.
    pub cancellation_reasons: Vec<String>,
}

impl StoreFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            cancellation_reasons: Vec::new(),
        }
    }

    pub fn transaction_canceled(message: impl Into<String>, reasons: Vec<String>) -> Self {
        Self {
            code: TRANSACTION_CANCELED.to_string(),
            message: message.into(),
            cancellation_reasons: reasons,
        }
    }
}

impl From<StoreFailure> for AccessError {
    fn from(failure: StoreFailure) -> Self {
        match failure.code.as_str() {
            CONDITIONAL_CHECK_FAILED => AccessError::ConditionFailed(failure.message),
            VALIDATION => AccessError::Validation(failure.message),
            RESOURCE_NOT_FOUND => AccessError::NotFound(failure.message),
            TRANSACTION_CANCELED => {
                if failure
                    .cancellation_reasons
                    .iter()
                    .any(|r| r.starts_with("ConditionalCheckFailed"))
                {
                    return AccessError::ConditionFailed(failure.message);
                }
                let reasons = failure
                    .cancellation_reasons
                    .into_iter()
                    .map(|r| if r == "None" { String::new() } else { r })
                    .collect();
                AccessError::TransactionCanceled { reasons }
            }
            _ => AccessError::RemoteStore {
                code: failure.code,
                message: failure.message,
            },
        }
    }
}

/// Failure reported by the key-wrapping capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct KeyWrapError {
    pub code: String,
    pub message: String,
}

impl KeyWrapError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<KeyWrapError> for AccessError {
    fn from(error: KeyWrapError) -> Self {
        AccessError::KeyWrapping {
            code: error.code,
            message: error.message,
        }
    }
}
