//! Core record-system types
//!
//! This module provides the driver-free building blocks: error types, database
//! values, the parameterized query builder, the schema classification cache,
//! the dirty-tracked record, and the hook registry.

pub mod error;
pub mod hooks;
pub mod query_builder;
pub mod record;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use hooks::{Hook, HookAction, HookRegistry};
pub use query_builder::{FetchOptions, InsertKind, OrderDirection, Where};
pub use record::{FieldDiff, Record};
pub use schema::{ColumnType, SchemaCache, TableSchema};
pub use value::{FieldMap, Row, Value};
