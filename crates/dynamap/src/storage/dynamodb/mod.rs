//! DynamoDB remote store.
//!
//! Implements `dynamap_core::storage::RemoteStore` using `aws-sdk-dynamodb`.

mod conversions;
mod error;
mod store;

pub use store::DynamoDbStore;
