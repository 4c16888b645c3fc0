//! MySQL backend
//!
//! This module contains everything that talks to the server: connection
//! configuration, the pooled façade, explicit transactions, the migration
//! runner, and the value conversions between core types and the driver.

pub mod config;
mod conv;
pub mod database;
mod executor;
pub mod migration;
pub mod transaction;

pub use config::MySqlConfig;
pub use database::MySqlDatabase;
pub use migration::{split_statements, MigrationRunner, ScriptFn};
pub use transaction::Transaction;
