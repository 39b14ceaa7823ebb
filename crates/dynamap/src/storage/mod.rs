//! Remote store adapters.

#[cfg(feature = "dynamodb")]
mod dynamodb;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoDbStore;

pub use dynamap_core::storage::{KeyWrapper, RemoteStore, StoreFailure};
