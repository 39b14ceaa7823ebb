//! Expression Builder.
//!
//! Every expression of one request (key condition, filter, condition, update,
//! projection) shares a single [`Placeholders`] allocator, so a request never
//! binds one placeholder to two attributes or two values.

mod condition;
mod key;
mod placeholders;
mod projection;
mod raw;
mod update;

pub use condition::{Condition, ConditionOp, Expr, MAX_IN_OPERANDS};
pub use key::{render_key_condition, SortKeyCondition};
pub use placeholders::Placeholders;
pub use projection::render_projection;
pub use raw::{combine, RawExpression};
pub use update::{render_update, validate_update, UpdateOp};
