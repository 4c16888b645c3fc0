//! Explicit transactions over an exclusively-held connection
//!
//! A [`Transaction`] owns one pooled connection for its whole life, so every
//! statement issued through it executes in submission order on that
//! connection. `commit` and `roll_back` consume the transaction and release
//! the connection exactly once; a transaction dropped without either is
//! logged and its connection is reset by the pool on return.

use crate::core::error::{DatabaseError, Result};
use crate::core::hooks::HookRegistry;
use crate::core::query_builder::{FetchOptions, InsertKind, Where};
use crate::core::record::Record;
use crate::core::schema::SchemaCache;
use crate::core::value::{FieldMap, Row, Value};
use mysql_async::{Conn, Pool};
use std::sync::Arc;
use tracing::warn;

use super::executor;

/// An in-flight transaction bound to one exclusive connection
pub struct Transaction {
    conn: Option<Conn>,
    schema: Arc<SchemaCache>,
    hooks: Arc<HookRegistry>,
}

impl Transaction {
    /// Acquire a dedicated connection and open the transaction
    pub(crate) async fn begin(
        pool: &Pool,
        schema: Arc<SchemaCache>,
        hooks: Arc<HookRegistry>,
    ) -> Result<Self> {
        let mut conn = pool.get_conn().await.map_err(|e| {
            DatabaseError::connection(format!("failed to acquire connection: {e}"))
        })?;
        executor::run_statement(&mut conn, "START TRANSACTION", Vec::new()).await?;

        Ok(Self {
            conn: Some(conn),
            schema,
            hooks,
        })
    }

    fn conn_mut(&mut self) -> Result<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| DatabaseError::transaction("transaction already finished"))
    }

    /// Commit and release the connection
    pub async fn commit(mut self) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| DatabaseError::transaction("transaction already finished"))?;
        executor::run_statement(&mut conn, "COMMIT", Vec::new()).await?;
        Ok(())
    }

    /// Roll back and release the connection
    pub async fn roll_back(mut self) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| DatabaseError::transaction("transaction already finished"))?;
        executor::run_statement(&mut conn, "ROLLBACK", Vec::new()).await?;
        Ok(())
    }

    /// Run a SELECT-style statement and return raw rows
    pub async fn query(&mut self, sql: &str, bindings: Vec<Value>) -> Result<Vec<Row>> {
        executor::query(self.conn_mut()?, sql, bindings).await
    }

    /// Run a SELECT-style statement and return the first row, if any
    pub async fn query_one(&mut self, sql: &str, bindings: Vec<Value>) -> Result<Option<Row>> {
        executor::query_one(self.conn_mut()?, sql, bindings).await
    }

    /// Run a statement and return the affected-row count
    pub async fn exec(&mut self, sql: &str, bindings: Vec<Value>) -> Result<u64> {
        executor::exec(self.conn_mut()?, sql, bindings).await
    }

    /// Fetch decoded records matching a WHERE specification
    pub async fn fetch(
        &mut self,
        table: &str,
        spec: &Where,
        options: &FetchOptions,
    ) -> Result<Vec<Record>> {
        let schema = Arc::clone(&self.schema);
        executor::fetch(self.conn_mut()?, &schema, table, spec, options).await
    }

    /// Fetch the first matching record, if any
    pub async fn fetch_one(
        &mut self,
        table: &str,
        spec: &Where,
        options: &FetchOptions,
    ) -> Result<Option<Record>> {
        let schema = Arc::clone(&self.schema);
        executor::fetch_one(self.conn_mut()?, &schema, table, spec, options).await
    }

    /// Existence probe
    pub async fn check_exists(&mut self, table: &str, spec: &Where) -> Result<bool> {
        executor::check_exists(self.conn_mut()?, table, spec).await
    }

    /// Row count, optionally of a specific column
    pub async fn get_count(
        &mut self,
        table: &str,
        spec: &Where,
        column: Option<&str>,
    ) -> Result<u64> {
        executor::get_count(self.conn_mut()?, table, spec, column).await
    }

    /// Insert a row and return it as a record (with the generated id)
    pub async fn insert(&mut self, table: &str, fields: FieldMap) -> Result<Record> {
        let schema = Arc::clone(&self.schema);
        executor::insert(self.conn_mut()?, &schema, InsertKind::Insert, table, fields).await
    }

    /// `INSERT IGNORE` variant of [`insert`](Transaction::insert)
    pub async fn insert_ignore(&mut self, table: &str, fields: FieldMap) -> Result<Record> {
        let schema = Arc::clone(&self.schema);
        executor::insert(self.conn_mut()?, &schema, InsertKind::Ignore, table, fields).await
    }

    /// `REPLACE` variant of [`insert`](Transaction::insert)
    pub async fn replace(&mut self, table: &str, fields: FieldMap) -> Result<Record> {
        let schema = Arc::clone(&self.schema);
        executor::insert(self.conn_mut()?, &schema, InsertKind::Replace, table, fields).await
    }

    /// Update matching rows with encoded partial fields
    pub async fn update(&mut self, table: &str, fields: &FieldMap, spec: &Where) -> Result<u64> {
        let schema = Arc::clone(&self.schema);
        executor::update(self.conn_mut()?, &schema, table, fields, spec).await
    }

    /// Delete matching rows
    pub async fn delete(&mut self, table: &str, spec: &Where) -> Result<u64> {
        executor::delete(self.conn_mut()?, table, spec).await
    }

    /// Persist a record's dirty fields inside this transaction
    pub async fn save(&mut self, record: &mut Record) -> Result<bool> {
        let schema = Arc::clone(&self.schema);
        let hooks = Arc::clone(&self.hooks);
        let Some(dirty) = executor::prepare_save(&hooks, record).await? else {
            return Ok(false);
        };
        executor::complete_save(self.conn_mut()?, &schema, &hooks, record, dirty).await?;
        Ok(true)
    }

    /// Decode raw fields and wrap them as a clean record
    pub fn build_record(&self, table: &str, fields: FieldMap) -> Result<Record> {
        let fields = self.schema.decode(table, fields)?;
        Ok(Record::new(table, fields))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!("transaction dropped without commit or rollback; connection returned to the pool for reset");
        }
    }
}
