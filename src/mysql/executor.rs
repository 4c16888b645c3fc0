//! Shared statement execution
//!
//! Every statement the façade or a transaction issues funnels through
//! [`run_statement`], which binds parameters, collects rows, and annotates
//! failures with the offending SQL text and bindings. The CRUD helpers here
//! are generic over the driver's `Queryable` so a pooled connection and a
//! transaction's exclusive connection share one implementation.

use crate::core::error::{DatabaseError, Result};
use crate::core::hooks::{HookAction, HookRegistry};
use crate::core::query_builder::{
    build_count, build_delete, build_exists, build_insert, build_select, build_update,
    FetchOptions, InsertKind, Where,
};
use crate::core::record::Record;
use crate::core::schema::SchemaCache;
use crate::core::value::{FieldMap, Row, Value};
use mysql_async::prelude::Queryable;
use mysql_async::Params;
use tracing::debug;

use super::conv::{row_to_fields, row_to_map, to_driver_value};

/// Everything a finished statement reports
pub(crate) struct StatementOutput {
    pub rows: Vec<mysql_async::Row>,
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
}

/// Execute one statement. Text protocol when there are no bindings (COMMIT and
/// friends are not preparable), binary protocol otherwise.
pub(crate) async fn run_statement<Q>(
    conn: &mut Q,
    sql: &str,
    bindings: Vec<Value>,
) -> Result<StatementOutput>
where
    Q: Queryable,
{
    debug!(statement = %sql, bindings = bindings.len(), "executing statement");

    let outcome = async {
        if bindings.is_empty() {
            let mut result = conn.query_iter(sql).await?;
            let rows = result.collect::<mysql_async::Row>().await?;
            Ok::<_, mysql_async::Error>(StatementOutput {
                affected_rows: result.affected_rows(),
                last_insert_id: result.last_insert_id(),
                rows,
            })
        } else {
            let params =
                Params::Positional(bindings.iter().cloned().map(to_driver_value).collect());
            let mut result = conn.exec_iter(sql, params).await?;
            let rows = result.collect::<mysql_async::Row>().await?;
            Ok(StatementOutput {
                affected_rows: result.affected_rows(),
                last_insert_id: result.last_insert_id(),
                rows,
            })
        }
    }
    .await;

    outcome.map_err(|source| DatabaseError::statement(sql, bindings, source))
}

pub(crate) async fn query<Q: Queryable>(
    conn: &mut Q,
    sql: &str,
    bindings: Vec<Value>,
) -> Result<Vec<Row>> {
    let output = run_statement(conn, sql, bindings).await?;
    Ok(output.rows.into_iter().map(row_to_map).collect())
}

pub(crate) async fn query_one<Q: Queryable>(
    conn: &mut Q,
    sql: &str,
    bindings: Vec<Value>,
) -> Result<Option<Row>> {
    let mut rows = query(conn, sql, bindings).await?;
    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(rows.swap_remove(0)))
    }
}

pub(crate) async fn exec<Q: Queryable>(
    conn: &mut Q,
    sql: &str,
    bindings: Vec<Value>,
) -> Result<u64> {
    let output = run_statement(conn, sql, bindings).await?;
    Ok(output.affected_rows)
}

pub(crate) async fn fetch<Q: Queryable>(
    conn: &mut Q,
    schema: &SchemaCache,
    table: &str,
    spec: &Where,
    options: &FetchOptions,
) -> Result<Vec<Record>> {
    let (sql, bindings) = build_select(table, spec, options);
    let output = run_statement(conn, &sql, bindings).await?;

    let mut records = Vec::with_capacity(output.rows.len());
    for row in output.rows {
        let fields = schema.decode(table, row_to_fields(row))?;
        records.push(Record::new(table, fields));
    }
    Ok(records)
}

pub(crate) async fn fetch_one<Q: Queryable>(
    conn: &mut Q,
    schema: &SchemaCache,
    table: &str,
    spec: &Where,
    options: &FetchOptions,
) -> Result<Option<Record>> {
    let mut records = fetch(conn, schema, table, spec, options).await?;
    if records.is_empty() {
        Ok(None)
    } else {
        Ok(Some(records.swap_remove(0)))
    }
}

pub(crate) async fn check_exists<Q: Queryable>(
    conn: &mut Q,
    table: &str,
    spec: &Where,
) -> Result<bool> {
    let (sql, bindings) = build_exists(table, spec);
    let output = run_statement(conn, &sql, bindings).await?;
    Ok(!output.rows.is_empty())
}

pub(crate) async fn get_count<Q: Queryable>(
    conn: &mut Q,
    table: &str,
    spec: &Where,
    column: Option<&str>,
) -> Result<u64> {
    let (sql, bindings) = build_count(table, spec, column);
    let output = run_statement(conn, &sql, bindings).await?;

    let count = output
        .rows
        .into_iter()
        .next()
        .map(row_to_map)
        .and_then(|row| row.get("count").and_then(Value::as_int))
        .unwrap_or(0);
    Ok(count.max(0) as u64)
}

pub(crate) async fn insert<Q: Queryable>(
    conn: &mut Q,
    schema: &SchemaCache,
    kind: InsertKind,
    table: &str,
    fields: FieldMap,
) -> Result<Record> {
    let encoded = schema.encode(table, &fields)?;
    let (sql, bindings) = build_insert(kind, table, &encoded)?;
    let output = run_statement(conn, &sql, bindings).await?;

    let mut fields = fields;
    if !fields.contains_key("id") {
        // 0 means the table has no auto-increment column
        if let Some(id) = output.last_insert_id.filter(|id| *id != 0) {
            fields.insert("id", Value::Int(id as i64));
        }
    }
    Ok(Record::new(table, fields))
}

pub(crate) async fn update<Q: Queryable>(
    conn: &mut Q,
    schema: &SchemaCache,
    table: &str,
    fields: &FieldMap,
    spec: &Where,
) -> Result<u64> {
    let encoded = schema.encode(table, fields)?;
    let (sql, bindings) = build_update(table, &encoded, spec)?;
    let output = run_statement(conn, &sql, bindings).await?;
    Ok(output.affected_rows)
}

pub(crate) async fn delete<Q: Queryable>(conn: &mut Q, table: &str, spec: &Where) -> Result<u64> {
    let (sql, bindings) = build_delete(table, spec);
    let output = run_statement(conn, &sql, bindings).await?;
    Ok(output.affected_rows)
}

/// First half of a save: capture the dirty set and run `before_save` hooks.
///
/// Returns `None` when there is nothing to persist (the save is a no-op and
/// must touch no connection). The dirty set is captured before the hooks run,
/// so hook-side mutations are not part of the in-flight UPDATE. A record
/// without an id cannot be keyed and fails validation before any I/O.
pub(crate) async fn prepare_save(
    hooks: &HookRegistry,
    record: &mut Record,
) -> Result<Option<FieldMap>> {
    let dirty = record.dirty();
    if dirty.is_empty() {
        return Ok(None);
    }

    let table = record.table().to_string();
    hooks
        .dispatch(&table, HookAction::BeforeSave, record)
        .await?;

    if record.id().is_none() {
        return Err(DatabaseError::validation(format!(
            "cannot save a record of \"{table}\" without an id"
        )));
    }

    Ok(Some(dirty))
}

/// Second half of a save: one UPDATE keyed by the record's id, then `on_save`
/// hooks, then dirty tracking is cleared. Any failure propagates without
/// clearing, so a retried save recomputes the same dirty set.
pub(crate) async fn complete_save<Q: Queryable>(
    conn: &mut Q,
    schema: &SchemaCache,
    hooks: &HookRegistry,
    record: &mut Record,
    dirty: FieldMap,
) -> Result<()> {
    let table = record.table().to_string();
    let encoded = schema.encode(&table, &dirty)?;
    let (sql, bindings) = build_update(&table, &encoded, &record.key())?;
    run_statement(conn, &sql, bindings).await?;

    hooks.dispatch(&table, HookAction::OnSave, record).await?;
    record.clear_dirty();
    Ok(())
}
