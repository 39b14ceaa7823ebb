//! Core building blocks for the dynamap data-access layer.
//!
//! Everything in this crate is pure and synchronous: schema registration,
//! wire value encoding, expression rendering, cursor and envelope codecs.
//! The capability traits for the remote store and the key-wrapping service
//! live in [`storage`]; the engine that drives them lives in the `dynamap`
//! crate.

pub mod cursor;
pub mod envelope;
pub mod error;
pub mod expression;
pub mod marshal;
pub mod model;
pub mod storage;
pub mod value;

pub use error::{AccessError, ModelDefinitionError, Result};
pub use marshal::Key;
pub use value::{AttributeValue, Item};
