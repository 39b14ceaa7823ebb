//! Capabilities the engine consumes: the remote store and the key wrapper.

mod error;
mod traits;
mod types;

pub use error::{
    KeyWrapError, StoreFailure, CONDITIONAL_CHECK_FAILED, RESOURCE_NOT_FOUND,
    TRANSACTION_CANCELED, VALIDATION,
};
pub use traits::{KeyWrapper, RemoteStore, StoreResult};
pub use types::{
    BatchGetItemInput, BatchGetItemOutput, BatchWriteItemInput, BatchWriteItemOutput, DataKey,
    DeleteItemInput, ExpressionAttributes, GetItemInput, GetItemOutput, PutItemInput, QueryInput,
    ReadOutput, ReturnValues, ScanInput, TransactWriteItem, TransactWriteItemsInput,
    UpdateItemInput, UpdateItemOutput, WriteRequest,
};
