//! Typed records over a partition/sort-key store.
//!
//! A [`Table`] binds one [`Record`] type to one table. It marshals records
//! through their [`Model`](dynamap_core::model::Model), renders expressions
//! with collision-free placeholders, seals encrypted fields in per-value
//! envelopes and orchestrates batch, paginated and transactional requests
//! against any [`RemoteStore`](dynamap_core::storage::RemoteStore).

pub mod config;
pub mod encryption;
pub mod orchestrator;
pub mod storage;
pub mod table;

#[cfg(feature = "testkit")]
pub mod testkit;

pub use dynamap_core::cursor::SortDirection;
pub use dynamap_core::expression::{
    ConditionOp, Expr, RawExpression, SortKeyCondition, UpdateOp,
};
pub use dynamap_core::model::{
    FieldDescriptor, IndexKind, IndexSpec, Model, ModelRegistry, Projection, Record,
    RecordDescription, Role,
};
pub use dynamap_core::{AccessError, AttributeValue, Item, Key, ModelDefinitionError, Result};

pub use config::EngineConfig;
pub use encryption::{EncryptionService, NonceSource, RandomNonce};
pub use orchestrator::RetryPolicy;
pub use table::{
    GetOptions, Page, QueryRequest, ScanRequest, Table, TableBuilder, TransactAction, Verify,
    WriteOptions,
};
