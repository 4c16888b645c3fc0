//! The database façade
//!
//! [`MySqlDatabase`] owns the connection pool, the schema cache and the hook
//! registry, and is the only object external layers touch. Plain operations
//! borrow a pooled connection per statement; transactional work goes through
//! [`start_transaction`](MySqlDatabase::start_transaction) or
//! [`run_in_transaction`](MySqlDatabase::run_in_transaction).

use crate::core::error::{DatabaseError, Result};
use crate::core::hooks::{Hook, HookRegistry};
use crate::core::query_builder::{quote_identifier, FetchOptions, InsertKind, Where};
use crate::core::record::Record;
use crate::core::schema::{parse_create_table, SchemaCache};
use crate::core::value::{FieldMap, Row, Value};
use mysql_async::{Conn, Pool};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

use super::config::MySqlConfig;
use super::conv::{first_column, row_to_map};
use super::executor;
use super::transaction::Transaction;

/// Database façade: pool, schema cache, and hook registry
#[derive(Clone)]
pub struct MySqlDatabase {
    pool: Pool,
    schema: Arc<SchemaCache>,
    hooks: Arc<HookRegistry>,
}

impl MySqlDatabase {
    /// Create the façade with a lazy connection pool (no I/O happens until
    /// the first statement)
    pub fn new(config: MySqlConfig) -> Result<Self> {
        let pool = Pool::new(config.to_opts()?);
        Ok(Self {
            pool,
            schema: Arc::new(SchemaCache::new()),
            hooks: Arc::new(HookRegistry::new()),
        })
    }

    /// Verify connectivity by acquiring and releasing one connection
    pub async fn init(&self) -> Result<()> {
        let _conn = self.acquire().await?;
        Ok(())
    }

    /// Drain the pool and close its connections
    pub async fn disconnect(&self) -> Result<()> {
        self.pool.clone().disconnect().await?;
        Ok(())
    }

    async fn acquire(&self) -> Result<Conn> {
        self.pool.get_conn().await.map_err(|e| {
            DatabaseError::connection(format!("failed to acquire connection: {e}"))
        })
    }

    /// The schema classification cache
    pub fn schema(&self) -> &SchemaCache {
        &self.schema
    }

    /// The hook registry
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Register a save hook, globally (`table` = `None`) or for one table
    pub fn add_hook(&self, table: Option<&str>, hook: Arc<dyn Hook>) {
        self.hooks.add_hook(table, hook);
    }

    /// Run a SELECT-style statement and return raw rows
    pub async fn query(&self, sql: &str, bindings: Vec<Value>) -> Result<Vec<Row>> {
        let mut conn = self.acquire().await?;
        executor::query(&mut conn, sql, bindings).await
    }

    /// Run a SELECT-style statement and return the first row, if any
    pub async fn query_one(&self, sql: &str, bindings: Vec<Value>) -> Result<Option<Row>> {
        let mut conn = self.acquire().await?;
        executor::query_one(&mut conn, sql, bindings).await
    }

    /// Run a statement and return the affected-row count
    pub async fn exec(&self, sql: &str, bindings: Vec<Value>) -> Result<u64> {
        let mut conn = self.acquire().await?;
        executor::exec(&mut conn, sql, bindings).await
    }

    /// Fetch decoded records matching a WHERE specification
    pub async fn fetch(
        &self,
        table: &str,
        spec: &Where,
        options: &FetchOptions,
    ) -> Result<Vec<Record>> {
        let mut conn = self.acquire().await?;
        executor::fetch(&mut conn, &self.schema, table, spec, options).await
    }

    /// Fetch the first matching record, if any
    pub async fn fetch_one(
        &self,
        table: &str,
        spec: &Where,
        options: &FetchOptions,
    ) -> Result<Option<Record>> {
        let mut conn = self.acquire().await?;
        executor::fetch_one(&mut conn, &self.schema, table, spec, options).await
    }

    /// Existence probe (`SELECT 1 ... LIMIT 1`)
    pub async fn check_exists(&self, table: &str, spec: &Where) -> Result<bool> {
        let mut conn = self.acquire().await?;
        executor::check_exists(&mut conn, table, spec).await
    }

    /// Row count, optionally of a specific column (for non-null counting)
    pub async fn get_count(
        &self,
        table: &str,
        spec: &Where,
        column: Option<&str>,
    ) -> Result<u64> {
        let mut conn = self.acquire().await?;
        executor::get_count(&mut conn, table, spec, column).await
    }

    /// Insert a row and return it as a record, with the generated id filled in
    /// when the caller did not supply one
    pub async fn insert(&self, table: &str, fields: FieldMap) -> Result<Record> {
        let mut conn = self.acquire().await?;
        executor::insert(&mut conn, &self.schema, InsertKind::Insert, table, fields).await
    }

    /// `INSERT IGNORE` variant of [`insert`](MySqlDatabase::insert)
    pub async fn insert_ignore(&self, table: &str, fields: FieldMap) -> Result<Record> {
        let mut conn = self.acquire().await?;
        executor::insert(&mut conn, &self.schema, InsertKind::Ignore, table, fields).await
    }

    /// `REPLACE` variant of [`insert`](MySqlDatabase::insert)
    pub async fn replace(&self, table: &str, fields: FieldMap) -> Result<Record> {
        let mut conn = self.acquire().await?;
        executor::insert(&mut conn, &self.schema, InsertKind::Replace, table, fields).await
    }

    /// Update matching rows with encoded partial fields
    pub async fn update(&self, table: &str, fields: &FieldMap, spec: &Where) -> Result<u64> {
        let mut conn = self.acquire().await?;
        executor::update(&mut conn, &self.schema, table, fields, spec).await
    }

    /// Delete matching rows
    pub async fn delete(&self, table: &str, spec: &Where) -> Result<u64> {
        let mut conn = self.acquire().await?;
        executor::delete(&mut conn, table, spec).await
    }

    /// Persist a record's dirty fields outside any transaction.
    ///
    /// Returns `Ok(false)` without acquiring a connection when nothing is
    /// dirty; otherwise runs `before_save` hooks, issues one UPDATE keyed by
    /// the record's id, runs `on_save` hooks, clears dirty tracking, and
    /// returns `Ok(true)`.
    pub async fn save(&self, record: &mut Record) -> Result<bool> {
        let Some(dirty) = executor::prepare_save(&self.hooks, record).await? else {
            return Ok(false);
        };
        let mut conn = self.acquire().await?;
        executor::complete_save(&mut conn, &self.schema, &self.hooks, record, dirty).await?;
        Ok(true)
    }

    /// Decode raw fields and wrap them as a clean record
    pub fn build_record(&self, table: &str, fields: FieldMap) -> Result<Record> {
        let fields = self.schema.decode(table, fields)?;
        Ok(Record::new(table, fields))
    }

    /// Open an explicit transaction on a dedicated connection
    pub async fn start_transaction(&self) -> Result<Transaction> {
        Transaction::begin(
            &self.pool,
            Arc::clone(&self.schema),
            Arc::clone(&self.hooks),
        )
        .await
    }

    /// Run `f` inside a transaction: commit on success, roll back and rethrow
    /// on failure. The connection is released on both paths.
    pub async fn run_in_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(
                &'a mut Transaction,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>
            + Send,
        T: Send,
    {
        let mut txn = self.start_transaction().await?;
        match f(&mut txn).await {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = txn.roll_back().await;
                Err(err)
            }
        }
    }

    /// Introspect user tables and rebuild the schema classification cache.
    ///
    /// Tables whose names start with `_` are reserved for bookkeeping and
    /// skipped. The cache is swapped wholesale; concurrent repopulation is the
    /// caller's responsibility to serialize (conventionally done once at
    /// startup).
    pub async fn populate_schema(&self) -> Result<()> {
        let mut conn = self.acquire().await?;

        let output = executor::run_statement(&mut conn, "SHOW TABLES", Vec::new()).await?;
        let tables: Vec<String> = output
            .rows
            .into_iter()
            .map(|row| first_column(row).as_string())
            .filter(|name| !name.starts_with('_'))
            .collect();

        let mut classified = HashMap::new();
        for table in tables {
            let sql = format!("SHOW CREATE TABLE {}", quote_identifier(&table));
            let output = executor::run_statement(&mut conn, &sql, Vec::new()).await?;

            let Some(row) = output.rows.into_iter().next().map(row_to_map) else {
                continue;
            };
            let Some(ddl) = row.get("Create Table").map(Value::as_string) else {
                continue;
            };

            let schema = parse_create_table(&ddl);
            if !schema.is_empty() {
                classified.insert(table.to_lowercase(), schema);
            }
        }

        info!(tables = classified.len(), "schema cache populated");
        self.schema.replace(classified);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DatabaseError;
    use crate::core::hooks::Hook;
    use async_trait::async_trait;

    fn offline_db() -> MySqlDatabase {
        // the pool is lazy, so a façade can exist without a reachable server
        MySqlDatabase::new(MySqlConfig::new().database("test")).unwrap()
    }

    #[tokio::test]
    async fn test_save_clean_record_is_noop() {
        let db = offline_db();
        let mut record = Record::new("users", FieldMap::new().field("id", 1));

        // no dirty fields: no connection is ever acquired
        let saved = db.save(&mut record).await.unwrap();
        assert!(!saved);
    }

    #[tokio::test]
    async fn test_failing_before_save_hook_aborts_before_io() {
        struct Refuse;

        #[async_trait]
        impl Hook for Refuse {
            async fn before_save(&self, _record: &mut Record) -> crate::core::error::Result<()> {
                Err(DatabaseError::validation("refused"))
            }
        }

        let db = offline_db();
        db.add_hook(Some("users"), Arc::new(Refuse));

        let mut record = Record::new("users", FieldMap::new().field("id", 1));
        record.set("name", "Bob");

        let err = db.save(&mut record).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));

        // dirty state survives a failed save, so a retry is safe
        assert!(record.is_dirty());
        assert_eq!(record.get("name"), Some(&Value::String("Bob".into())));
    }

    #[tokio::test]
    async fn test_build_record_decodes_via_schema() {
        use crate::core::schema::{parse_create_table, TableSchema};

        let db = offline_db();
        let ddl = "CREATE TABLE `users` (\n  `is_active` tinyint(1) NOT NULL\n)";
        let mut tables = HashMap::<String, TableSchema>::new();
        tables.insert("users".into(), parse_create_table(ddl));
        db.schema().replace(tables);

        let record = db
            .build_record("users", FieldMap::new().field("is_active", 1))
            .unwrap();
        assert_eq!(record.get("is_active"), Some(&Value::Bool(true)));
        assert!(!record.is_dirty());
    }
}
