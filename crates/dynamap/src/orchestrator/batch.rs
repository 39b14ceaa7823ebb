use dynamap_core::storage::{
    BatchGetItemInput, BatchWriteItemInput, RemoteStore, WriteRequest,
};
use dynamap_core::{AccessError, Item, Result};

use super::backoff::{batch_retry_delay, Sleeper};

/// Maximum keys per BatchGetItem call.
pub const MAX_BATCH_GET: usize = 100;
/// Maximum requests per BatchWriteItem call.
pub const MAX_BATCH_WRITE: usize = 25;

pub const DEFAULT_BATCH_MAX_RETRIES: u32 = 5;

/// Fetches every key, chunking and re-submitting unprocessed keys.
///
/// `template` carries the table name and read options; its `keys` are ignored.
/// Unprocessed keys from all chunks are pooled and retried together, with one
/// backoff sleep per retry round.
pub async fn batch_get(
    store: &dyn RemoteStore,
    sleeper: &dyn Sleeper,
    template: &BatchGetItemInput,
    keys: Vec<Item>,
    max_retries: u32,
) -> Result<Vec<Item>> {
    let mut items = Vec::with_capacity(keys.len());
    let mut pending = keys;
    let mut attempt = 0;

    while !pending.is_empty() {
        let mut unprocessed = Vec::new();
        for chunk in pending.chunks(MAX_BATCH_GET) {
            tracing::debug!(
                operation = "BatchGetItem",
                table = %template.table_name,
                keys = chunk.len(),
                attempt,
                "sending batch"
            );
            let output = store
                .batch_get_item(BatchGetItemInput {
                    keys: chunk.to_vec(),
                    ..template.clone()
                })
                .await?;
            items.extend(output.items);
            unprocessed.extend(output.unprocessed_keys);
        }

        if unprocessed.is_empty() {
            break;
        }
        attempt = next_attempt("BatchGetItem", attempt, max_retries, unprocessed.len())?;
        sleeper.sleep(batch_retry_delay(attempt)).await;
        pending = unprocessed;
    }

    Ok(items)
}

/// Applies every write request, chunking and re-submitting unprocessed ones.
pub async fn batch_write(
    store: &dyn RemoteStore,
    sleeper: &dyn Sleeper,
    table_name: &str,
    requests: Vec<WriteRequest>,
    max_retries: u32,
) -> Result<()> {
    let mut pending = requests;
    let mut attempt = 0;

    while !pending.is_empty() {
        let mut unprocessed = Vec::new();
        for chunk in pending.chunks(MAX_BATCH_WRITE) {
            tracing::debug!(
                operation = "BatchWriteItem",
                table = %table_name,
                requests = chunk.len(),
                attempt,
                "sending batch"
            );
            let output = store
                .batch_write_item(BatchWriteItemInput {
                    table_name: table_name.to_string(),
                    requests: chunk.to_vec(),
                })
                .await?;
            unprocessed.extend(output.unprocessed);
        }

        if unprocessed.is_empty() {
            break;
        }
        attempt = next_attempt("BatchWriteItem", attempt, max_retries, unprocessed.len())?;
        sleeper.sleep(batch_retry_delay(attempt)).await;
        pending = unprocessed;
    }

    Ok(())
}

fn next_attempt(operation: &str, attempt: u32, max_retries: u32, unprocessed: usize) -> Result<u32> {
    if attempt >= max_retries {
        tracing::warn!(operation, unprocessed, max_retries, "batch retry budget exhausted");
        return Err(AccessError::BatchRetryExceeded {
            operation: operation.to_string(),
            unprocessed,
        });
    }
    let attempt = attempt + 1;
    tracing::warn!(
        operation,
        unprocessed,
        attempt,
        delay_ms = batch_retry_delay(attempt).as_millis() as u64,
        "retrying unprocessed batch items"
    );
    Ok(attempt)
}
