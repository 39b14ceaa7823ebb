use async_trait::async_trait;

use super::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput, DataKey,
    DeleteItemInput, GetItemInput, GetItemOutput, KeyWrapError, PutItemInput, QueryInput,
    ReadOutput, ScanInput, StoreFailure, TransactWriteItemsInput, UpdateItemInput,
    UpdateItemOutput,
};

/// Result type for remote store calls.
pub type StoreResult<T> = std::result::Result<T, StoreFailure>;

/// The partition/sort-key store the engine talks to.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput>;

    async fn put_item(&self, input: PutItemInput) -> StoreResult<()>;

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<()>;

    async fn update_item(&self, input: UpdateItemInput) -> StoreResult<UpdateItemOutput>;

    async fn query(&self, input: QueryInput) -> StoreResult<ReadOutput>;

    async fn scan(&self, input: ScanInput) -> StoreResult<ReadOutput>;

    /// At most 100 keys per call.
    async fn batch_get_item(&self, input: BatchGetItemInput) -> StoreResult<BatchGetItemOutput>;

    /// At most 25 requests per call.
    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput>;

    /// At most 100 actions, applied atomically.
    async fn transact_write_items(&self, input: TransactWriteItemsInput) -> StoreResult<()>;
}

/// Key-management capability used to wrap and unwrap data keys.
#[async_trait]
pub trait KeyWrapper: Send + Sync {
    /// Generates a 256-bit data key under `key_id`.
    async fn generate_data_key(&self, key_id: &str) -> std::result::Result<DataKey, KeyWrapError>;

    /// Returns the plaintext of a wrapped data key.
    async fn decrypt(&self, wrapped: &[u8]) -> std::result::Result<Vec<u8>, KeyWrapError>;
}
