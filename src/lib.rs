//! # MySQL Record System
//!
//! A transactional record-mapping layer over MySQL: connection pooling and
//! explicit transactions, a parameterized query builder, a schema
//! introspection cache that classifies column semantics, dirty-tracked live
//! records with save lifecycle hooks, and a forward-only migration runner.
//!
//! ## Features
//!
//! - **Dirty tracking**: records persist only the fields that actually
//!   changed, and setting a field back to its original value makes it clean
//!   again
//! - **Schema-aware values**: tinyint(1) booleans, decimals, JSON documents,
//!   geometry points and date columns are decoded to typed values and encoded
//!   back automatically
//! - **Exclusive transactions**: a transaction owns one pooled connection for
//!   its whole life, with commit/rollback releasing it exactly once
//! - **Lifecycle hooks**: global and per-table `before_save`/`on_save`
//!   callbacks, dispatched in registration order
//! - **Resumable migrations**: a flat directory applied in lexicographic
//!   order, recorded one row per migration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mysql_record_system::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let db = MySqlDatabase::new(MySqlConfig::from_env())?;
//!     db.init().await?;
//!
//!     // bring the schema current and classify column semantics
//!     MigrationRunner::new(&db).run().await?;
//!     db.populate_schema().await?;
//!
//!     // fetch, mutate, save: only changed fields are written
//!     if let Some(mut user) = db
//!         .fetch_one("users", &Where::new().eq("email", "alice@example.com"), &FetchOptions::new())
//!         .await?
//!     {
//!         user.set("is_active", false);
//!         db.save(&mut user).await?;
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```rust,no_run
//! use mysql_record_system::prelude::*;
//!
//! # async fn example(db: &MySqlDatabase) -> Result<()> {
//! let mut txn = db.start_transaction().await?;
//! txn.insert("audit_log", FieldMap::new().field("event", "signup")).await?;
//! txn.commit().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! mysql_record_system/
//! ├── src/
//! │   ├── core/              # Driver-free building blocks
//! │   │   ├── error.rs       # Error taxonomy
//! │   │   ├── value.rs       # Value types and the ordered field map
//! │   │   ├── query_builder.rs  # WHERE fragments and CRUD statements
//! │   │   ├── schema.rs      # Column classification cache
//! │   │   ├── record.rs      # Dirty-tracked records
//! │   │   └── hooks.rs       # Save lifecycle hooks
//! │   ├── mysql/             # The MySQL backend
//! │   │   ├── config.rs      # Connection configuration
//! │   │   ├── database.rs    # Pooled façade
//! │   │   ├── transaction.rs # Exclusive-connection transactions
//! │   │   └── migration.rs   # Migration runner
//! │   └── lib.rs
//! ├── tests/                 # Integration and property tests
//! └── benches/               # Criterion benchmarks
//! ```

/// Core record-system types
pub mod core;

/// MySQL backend
pub mod mysql;

/// Prelude for convenient imports
///
/// ```rust
/// use mysql_record_system::prelude::*;
///
/// fn build_filter() -> Where {
///     Where::new().eq("status", "active")
/// }
/// ```
pub mod prelude {
    pub use crate::core::{
        ColumnType, DatabaseError, FetchOptions, FieldDiff, FieldMap, Hook, HookAction,
        HookRegistry, InsertKind, OrderDirection, Record, Result, Row, SchemaCache, Value, Where,
    };
    pub use crate::mysql::{MigrationRunner, MySqlConfig, MySqlDatabase, Transaction};
}

// Re-export at root level for convenience
pub use crate::core::{
    ColumnType, DatabaseError, FetchOptions, FieldDiff, FieldMap, Hook, HookAction, HookRegistry,
    InsertKind, OrderDirection, Record, Result, Row, SchemaCache, Value, Where,
};
pub use crate::mysql::{MigrationRunner, MySqlConfig, MySqlDatabase, Transaction};
