use dynamap_core::storage::{RemoteStore, TransactWriteItem, TransactWriteItemsInput};
use dynamap_core::{AccessError, Result};

/// Maximum actions in one atomic write.
pub const MAX_TRANSACT_ITEMS: usize = 100;

pub fn check_action_count(count: usize) -> Result<()> {
    if count == 0 || count > MAX_TRANSACT_ITEMS {
        return Err(AccessError::validation(format!(
            "transactions require 1..={MAX_TRANSACT_ITEMS} actions (got {count})"
        )));
    }
    Ok(())
}

/// Submits a prepared atomic write.
pub async fn transact_write(store: &dyn RemoteStore, items: Vec<TransactWriteItem>) -> Result<()> {
    check_action_count(items.len())?;

    let actions = items.len();
    tracing::debug!(operation = "TransactWriteItems", actions, "sending transaction");
    store
        .transact_write_items(TransactWriteItemsInput { items })
        .await
        .map_err(|failure| {
            let err = AccessError::from(failure);
            match &err {
                AccessError::TransactionCanceled { reasons } => {
                    tracing::info!(actions, reasons = ?reasons, "transaction canceled");
                }
                AccessError::ConditionFailed(message) => {
                    tracing::info!(actions, message = %message, "transaction condition failed");
                }
                _ => {}
            }
            err
        })
}
