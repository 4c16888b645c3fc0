//! Schema introspection cache
//!
//! Classifies columns whose wire representation differs from their application
//! type: booleans stored as tinyints, decimals returned as text, JSON and
//! geometry returned as bytes, and date-only columns. Classification parses
//! the column lines of `SHOW CREATE TABLE` output; the cache is populated once
//! (see [`MySqlDatabase::populate_schema`]) and read-only afterward until
//! explicitly repopulated.
//!
//! [`MySqlDatabase::populate_schema`]: crate::mysql::MySqlDatabase::populate_schema

use super::error::{DatabaseError, Result};
use super::value::{FieldMap, Value};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Column name prefixes that mark a bare tinyint as boolean.
///
/// This encodes a naming convention (`is_active`, `has_children`, ...); the
/// match is a plain prefix, so `island` also qualifies.
const BOOL_NAME_PREFIXES: [&str; 8] = ["is", "was", "has", "had", "does", "did", "should", "can"];

/// Semantic column classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// tinyint(1), or a bare tinyint with a boolean-verb name prefix
    Bool,
    /// decimal/numeric
    Float,
    /// json
    Json,
    /// geometry point
    Point,
    /// date (no time component)
    Date,
}

/// Per-table mapping of classified columns. Unclassified columns are absent
/// and pass through encode/decode unmodified.
pub type TableSchema = HashMap<String, ColumnType>;

/// Process-wide schema cache, keyed by lowercased table name.
///
/// Mutated only by [`replace`](SchemaCache::replace) during population; all
/// other access is read-only.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: RwLock<HashMap<String, TableSchema>>,
}

impl SchemaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly introspected table map
    pub fn replace(&self, tables: HashMap<String, TableSchema>) {
        *self.tables.write() = tables;
    }

    /// True if no tables have been classified
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Look up a single column's classification
    pub fn column_type(&self, table: &str, column: &str) -> Option<ColumnType> {
        self.tables
            .read()
            .get(&table.to_lowercase())
            .and_then(|schema| schema.get(column))
            .copied()
    }

    /// Clone a table's classified columns, if any
    pub fn table_schema(&self, table: &str) -> Option<TableSchema> {
        self.tables.read().get(&table.to_lowercase()).cloned()
    }

    /// Decode raw driver values into application values for one row's fields
    pub fn decode(&self, table: &str, fields: FieldMap) -> Result<FieldMap> {
        let Some(schema) = self.table_schema(table) else {
            return Ok(fields);
        };

        let mut decoded = FieldMap::with_capacity(fields.len());
        for (name, value) in fields {
            let value = match schema.get(&name) {
                Some(column_type) => decode_value(*column_type, value, &name)?,
                None => value,
            };
            decoded.insert(name, value);
        }
        Ok(decoded)
    }

    /// Encode application values into database-ready values for one row's fields
    pub fn encode(&self, table: &str, fields: &FieldMap) -> Result<FieldMap> {
        let Some(schema) = self.table_schema(table) else {
            return Ok(fields.clone());
        };

        let mut encoded = FieldMap::with_capacity(fields.len());
        for (name, value) in fields.iter() {
            let value = match schema.get(name) {
                Some(column_type) => encode_value(*column_type, value.clone(), name)?,
                None => value.clone(),
            };
            encoded.insert(name, value);
        }
        Ok(encoded)
    }
}

/// Extract classified columns from `SHOW CREATE TABLE` output.
///
/// Only column-definition lines (those opening with a backtick-quoted name)
/// are considered; keys, constraints, and table options are skipped.
pub fn parse_create_table(ddl: &str) -> TableSchema {
    let mut schema = TableSchema::new();

    for line in ddl.lines().skip(1) {
        let line = line.trim_start();
        let Some(rest) = line.strip_prefix('`') else {
            continue;
        };
        let Some((name, rest)) = read_quoted_identifier(rest) else {
            continue;
        };
        let type_token: String = rest
            .trim_start()
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != ',')
            .collect::<String>()
            .to_lowercase();

        if let Some(column_type) = classify_column(&name, &type_token) {
            schema.insert(name, column_type);
        }
    }

    schema
}

/// Read up to the closing backtick; a doubled backtick is an escaped literal
fn read_quoted_identifier(s: &str) -> Option<(String, &str)> {
    let mut name = String::new();
    let mut rest = s;
    loop {
        let close = rest.find('`')?;
        name.push_str(&rest[..close]);
        let after = &rest[close + 1..];
        if let Some(stripped) = after.strip_prefix('`') {
            name.push('`');
            rest = stripped;
        } else {
            return Some((name, after));
        }
    }
}

fn classify_column(name: &str, type_token: &str) -> Option<ColumnType> {
    if type_token == "tinyint(1)" {
        Some(ColumnType::Bool)
    } else if type_token == "tinyint" {
        // MySQL 8.0.19+ omits display widths, so fall back to the name heuristic
        if BOOL_NAME_PREFIXES.iter().any(|p| name.starts_with(p)) {
            Some(ColumnType::Bool)
        } else {
            None
        }
    } else if type_token.starts_with("decimal") || type_token.starts_with("numeric") {
        Some(ColumnType::Float)
    } else if type_token == "json" {
        Some(ColumnType::Json)
    } else if type_token == "point" {
        Some(ColumnType::Point)
    } else if type_token == "date" {
        Some(ColumnType::Date)
    } else {
        None
    }
}

fn decode_value(column_type: ColumnType, value: Value, column: &str) -> Result<Value> {
    if value.is_null() {
        return Ok(value);
    }

    match column_type {
        ColumnType::Bool => Ok(match value {
            Value::Int(i) => Value::Bool(i != 0),
            Value::Double(f) => Value::Bool(f != 0.0),
            other => other,
        }),
        ColumnType::Float => match value {
            Value::Int(i) => Ok(Value::Double(i as f64)),
            Value::String(s) => s.trim().parse::<f64>().map(Value::Double).map_err(|_| {
                DatabaseError::validation(format!(
                    "decimal column \"{column}\" holds unparsable value \"{s}\""
                ))
            }),
            Value::Bytes(b) => {
                let text = std::str::from_utf8(&b).map_err(|_| {
                    DatabaseError::validation(format!(
                        "decimal column \"{column}\" holds non-text bytes"
                    ))
                })?;
                text.trim().parse::<f64>().map(Value::Double).map_err(|_| {
                    DatabaseError::validation(format!(
                        "decimal column \"{column}\" holds unparsable value \"{text}\""
                    ))
                })
            }
            other => Ok(other),
        },
        ColumnType::Json => match value {
            Value::String(s) => serde_json::from_str(&s).map(Value::Json).map_err(|e| {
                DatabaseError::validation(format!("json column \"{column}\" is malformed: {e}"))
            }),
            Value::Bytes(b) => serde_json::from_slice(&b).map(Value::Json).map_err(|e| {
                DatabaseError::validation(format!("json column \"{column}\" is malformed: {e}"))
            }),
            other => Ok(other),
        },
        ColumnType::Point => match value {
            Value::Bytes(b) => parse_geometry_point(&b).ok_or_else(|| {
                DatabaseError::validation(format!(
                    "point column \"{column}\" holds an unsupported geometry"
                ))
            }),
            other => Ok(other),
        },
        ColumnType::Date => Ok(match value {
            Value::DateTime(dt) => Value::Date(dt.date()),
            Value::String(s) => match s.get(..10).and_then(|d| d.parse().ok()) {
                Some(date) => Value::Date(date),
                None => Value::String(s),
            },
            other => other,
        }),
    }
}

fn encode_value(column_type: ColumnType, value: Value, column: &str) -> Result<Value> {
    if value.is_null() {
        return Ok(value);
    }

    match column_type {
        ColumnType::Bool => Ok(match value {
            Value::Bool(b) => Value::Int(b as i64),
            other => other,
        }),
        ColumnType::Json => match value {
            Value::Json(j) => Ok(Value::String(j.to_string())),
            Value::String(_) => Ok(value),
            Value::Bool(b) => Ok(Value::String(serde_json::Value::Bool(b).to_string())),
            Value::Int(i) => Ok(Value::String(serde_json::Value::from(i).to_string())),
            Value::Double(f) => Ok(Value::String(serde_json::Value::from(f).to_string())),
            other => Err(DatabaseError::validation(format!(
                "json column \"{column}\" cannot encode a {} value",
                other.type_name()
            ))),
        },
        ColumnType::Point => match value {
            Value::Point { .. } => Ok(value),
            Value::Json(serde_json::Value::Object(map)) => {
                let x = map.get("x").and_then(serde_json::Value::as_f64);
                let y = map.get("y").and_then(serde_json::Value::as_f64);
                match (x, y) {
                    (Some(x), Some(y)) => Ok(Value::Point { x, y }),
                    _ => Err(DatabaseError::validation(format!(
                        "point column \"{column}\" must be an object with x and y properties"
                    ))),
                }
            }
            other => Err(DatabaseError::validation(format!(
                "point column \"{column}\" must be a point value, got {}",
                other.type_name()
            ))),
        },
        ColumnType::Float | ColumnType::Date => Ok(value),
    }
}

/// Parse MySQL's internal geometry encoding: a 4-byte SRID followed by WKB
/// (byte-order flag, u32 type tag, then two f64 coordinates for a point).
fn parse_geometry_point(bytes: &[u8]) -> Option<Value> {
    if bytes.len() != 25 {
        return None;
    }
    let wkb = &bytes[4..];
    let little_endian = match wkb[0] {
        0 => false,
        1 => true,
        _ => return None,
    };

    let read_u32 = |b: &[u8]| -> u32 {
        let arr: [u8; 4] = b.try_into().unwrap_or_default();
        if little_endian {
            u32::from_le_bytes(arr)
        } else {
            u32::from_be_bytes(arr)
        }
    };
    let read_f64 = |b: &[u8]| -> f64 {
        let arr: [u8; 8] = b.try_into().unwrap_or_default();
        if little_endian {
            f64::from_le_bytes(arr)
        } else {
            f64::from_be_bytes(arr)
        }
    };

    if read_u32(&wkb[1..5]) != 1 {
        return None;
    }

    Some(Value::Point {
        x: read_f64(&wkb[5..13]),
        y: read_f64(&wkb[13..21]),
    })
}
