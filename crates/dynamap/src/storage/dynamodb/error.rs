//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to `StoreFailure` codes from `dynamap_core::storage`.

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;

use dynamap_core::storage::{StoreFailure, VALIDATION};

/// Map any SDK error through its service error code.
///
/// Transport-level failures carry no code and surface as `SdkError`.
pub fn map_sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> StoreFailure
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    match err.code() {
        Some(code) => StoreFailure::new(code, err.message().unwrap_or_default()),
        None => StoreFailure::new(
            "SdkError",
            format!("{operation} failed: {}", DisplayErrorContext(&err)),
        ),
    }
}

/// Map a TransactWriteItems SDK error, keeping per-action cancellation reasons.
pub fn map_transact_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
) -> StoreFailure {
    if let Some(TransactWriteItemsError::TransactionCanceledException(canceled)) =
        err.as_service_error()
    {
        let reasons = canceled
            .cancellation_reasons()
            .iter()
            .map(|reason| reason.code().unwrap_or_default().to_string())
            .collect();
        return StoreFailure::transaction_canceled(
            canceled.message().unwrap_or_default(),
            reasons,
        );
    }
    map_sdk_error("TransactWriteItems", err)
}

/// A request the SDK refused to build is a malformed request.
pub fn map_build_error(err: BuildError) -> StoreFailure {
    StoreFailure::new(VALIDATION, err.to_string())
}
