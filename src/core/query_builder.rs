//! Parameterized SQL construction
//!
//! Builds WHERE fragments and CRUD statements for the MySQL dialect: backtick
//! identifier quoting and positional `?` placeholders. Values are never
//! interpolated into SQL text; the only literal shapes are `IS NULL`, the
//! placeholder list inside `IN (...)`, and `POINT(?, ?)` construction (whose
//! coordinates are still bound).

use super::error::{DatabaseError, Result};
use super::value::{FieldMap, Value};

/// Quote an identifier with backticks, doubling any embedded backtick
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// ORDER BY direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (the default)
    Asc,
    /// Descending order
    Desc,
}

impl OrderDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A single WHERE condition
#[derive(Debug, Clone)]
enum Condition {
    Eq(Value),
    In(Vec<Value>),
    IsNull,
}

/// Ordered WHERE specification: field to condition.
///
/// An equality against [`Value::Null`] means `IS NULL`; a list means `IN`.
/// Conditions are joined with `AND` in insertion order.
///
/// # Example
///
/// ```
/// use mysql_record_system::core::query_builder::Where;
///
/// let (fragment, bindings) = Where::new()
///     .eq("status", "active")
///     .is_null("deleted_at")
///     .build();
/// assert_eq!(fragment, " WHERE `status`=? AND `deleted_at` IS NULL");
/// assert_eq!(bindings.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Where {
    conditions: Vec<(String, Condition)>,
}

impl Where {
    /// Create an empty WHERE specification
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition (`Value::Null` becomes `IS NULL`)
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let condition = if value.is_null() {
            Condition::IsNull
        } else {
            Condition::Eq(value)
        };
        self.conditions.push((column.to_string(), condition));
        self
    }

    /// Add an `IN` list condition
    #[must_use]
    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.conditions.push((column.to_string(), Condition::In(values)));
        self
    }

    /// Add an `IS NULL` condition
    #[must_use]
    pub fn is_null(mut self, column: &str) -> Self {
        self.conditions.push((column.to_string(), Condition::IsNull));
        self
    }

    /// True if no conditions have been added
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Build the fragment (with its leading ` WHERE `) and ordered bindings.
    ///
    /// An empty specification yields `("", [])`.
    pub fn build(&self) -> (String, Vec<Value>) {
        if self.conditions.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut bindings = Vec::new();

        for (column, condition) in &self.conditions {
            match condition {
                Condition::IsNull => {
                    clauses.push(format!("{} IS NULL", quote_identifier(column)));
                }
                Condition::Eq(value) => {
                    clauses.push(format!(
                        "{}={}",
                        quote_identifier(column),
                        value_placeholder(value)
                    ));
                    push_binding(&mut bindings, value.clone());
                }
                Condition::In(values) if values.is_empty() => {
                    // an empty IN list can never match
                    clauses.push("0 = 1".to_string());
                }
                Condition::In(values) => {
                    let placeholders: Vec<&str> =
                        values.iter().map(value_placeholder).collect();
                    clauses.push(format!(
                        "{} IN ({})",
                        quote_identifier(column),
                        placeholders.join(",")
                    ));
                    for value in values {
                        push_binding(&mut bindings, value.clone());
                    }
                }
            }
        }

        (format!(" WHERE {}", clauses.join(" AND ")), bindings)
    }
}

/// Column restriction and ordering options for fetches
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub(crate) cols: Vec<String>,
    pub(crate) order: Vec<(String, OrderDirection)>,
}

impl FetchOptions {
    /// Create default options (`SELECT *`, no ordering)
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the selected columns
    #[must_use]
    pub fn cols(mut self, columns: &[&str]) -> Self {
        self.cols = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add an ascending ORDER BY column
    #[must_use]
    pub fn order_by(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add a descending ORDER BY column
    #[must_use]
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order.push((column.to_string(), OrderDirection::Desc));
        self
    }
}

/// INSERT statement flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    /// Plain `INSERT`
    Insert,
    /// `INSERT IGNORE`
    Ignore,
    /// `REPLACE`
    Replace,
}

impl InsertKind {
    fn as_sql(&self) -> &'static str {
        match self {
            InsertKind::Insert => "INSERT INTO",
            InsertKind::Ignore => "INSERT IGNORE INTO",
            InsertKind::Replace => "REPLACE INTO",
        }
    }
}

/// The SQL shape a bound value occupies (points construct `POINT(?, ?)`)
fn value_placeholder(value: &Value) -> &'static str {
    match value {
        Value::Point { .. } => "POINT(?, ?)",
        _ => "?",
    }
}

/// Append a value's bindings, flattening points into their coordinates
fn push_binding(bindings: &mut Vec<Value>, value: Value) {
    match value {
        Value::Point { x, y } => {
            bindings.push(Value::Double(x));
            bindings.push(Value::Double(y));
        }
        value => bindings.push(value),
    }
}

/// Build a SELECT statement
pub fn build_select(table: &str, spec: &Where, options: &FetchOptions) -> (String, Vec<Value>) {
    let columns = if options.cols.is_empty() {
        "*".to_string()
    } else {
        options
            .cols
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(",")
    };

    let (fragment, bindings) = spec.build();
    let mut sql = format!("SELECT {} FROM {}{}", columns, quote_identifier(table), fragment);

    if !options.order.is_empty() {
        let order = options
            .order
            .iter()
            .map(|(col, dir)| format!("{} {}", quote_identifier(col), dir.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }

    (sql, bindings)
}

/// Build an existence probe (`SELECT 1 ... LIMIT 1`)
pub fn build_exists(table: &str, spec: &Where) -> (String, Vec<Value>) {
    let (fragment, bindings) = spec.build();
    (
        format!("SELECT 1 FROM {}{} LIMIT 1", quote_identifier(table), fragment),
        bindings,
    )
}

/// Build a COUNT statement, optionally counting a specific column
pub fn build_count(table: &str, spec: &Where, column: Option<&str>) -> (String, Vec<Value>) {
    let counted = match column {
        Some(col) => format!("COUNT({})", quote_identifier(col)),
        None => "COUNT(*)".to_string(),
    };
    let (fragment, bindings) = spec.build();
    (
        format!(
            "SELECT {} AS {} FROM {}{}",
            counted,
            quote_identifier("count"),
            quote_identifier(table),
            fragment
        ),
        bindings,
    )
}

/// Build an INSERT/INSERT IGNORE/REPLACE statement from encoded fields
pub fn build_insert(
    kind: InsertKind,
    table: &str,
    fields: &FieldMap,
) -> Result<(String, Vec<Value>)> {
    if fields.is_empty() {
        return Err(DatabaseError::validation(format!(
            "insert into \"{table}\" requires at least one field"
        )));
    }

    let mut columns = Vec::with_capacity(fields.len());
    let mut placeholders = Vec::with_capacity(fields.len());
    let mut bindings = Vec::with_capacity(fields.len());

    for (name, value) in fields.iter() {
        columns.push(quote_identifier(name));
        placeholders.push(value_placeholder(value));
        push_binding(&mut bindings, value.clone());
    }

    let sql = format!(
        "{} {} ({}) VALUES ({})",
        kind.as_sql(),
        quote_identifier(table),
        columns.join(","),
        placeholders.join(",")
    );

    Ok((sql, bindings))
}

/// Build an UPDATE statement from encoded fields and a WHERE specification
pub fn build_update(
    table: &str,
    fields: &FieldMap,
    spec: &Where,
) -> Result<(String, Vec<Value>)> {
    if fields.is_empty() {
        return Err(DatabaseError::validation(format!(
            "update of \"{table}\" requires at least one field"
        )));
    }

    let mut assignments = Vec::with_capacity(fields.len());
    let mut bindings = Vec::with_capacity(fields.len());

    for (name, value) in fields.iter() {
        assignments.push(format!(
            "{}={}",
            quote_identifier(name),
            value_placeholder(value)
        ));
        push_binding(&mut bindings, value.clone());
    }

    let (fragment, where_bindings) = spec.build();
    bindings.extend(where_bindings);

    let sql = format!(
        "UPDATE {} SET {}{}",
        quote_identifier(table),
        assignments.join(","),
        fragment
    );

    Ok((sql, bindings))
}

/// Build a DELETE statement
pub fn build_delete(table: &str, spec: &Where) -> (String, Vec<Value>) {
    let (fragment, bindings) = spec.build();
    (
        format!("DELETE FROM {}{}", quote_identifier(table), fragment),
        bindings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_where() {
        let (fragment, bindings) = Where::new().build();
        assert_eq!(fragment, "");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_equality() {
        let (fragment, bindings) = Where::new().eq("id", 42).build();
        assert_eq!(fragment, " WHERE `id`=?");
        assert_eq!(bindings, vec![Value::Int(42)]);
    }

    #[test]
    fn test_where_in_list() {
        let (fragment, bindings) = Where::new().is_in("status", ["a", "b"]).build();
        assert_eq!(fragment, " WHERE `status` IN (?,?)");
        assert_eq!(
            bindings,
            vec![Value::String("a".into()), Value::String("b".into())]
        );
    }

    #[test]
    fn test_where_empty_in_list() {
        let (fragment, bindings) = Where::new().is_in("id", Vec::<i64>::new()).build();
        assert_eq!(fragment, " WHERE 0 = 1");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_null_equality_is_null() {
        let (fragment, bindings) = Where::new().eq("deletedAt", Value::Null).build();
        assert_eq!(fragment, " WHERE `deletedAt` IS NULL");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_where_multiple_conditions() {
        let (fragment, bindings) = Where::new()
            .eq("status", "active")
            .eq("age", 21)
            .is_null("deleted_at")
            .build();
        assert_eq!(
            fragment,
            " WHERE `status`=? AND `age`=? AND `deleted_at` IS NULL"
        );
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_where_point_constructs_literal() {
        let (fragment, bindings) = Where::new().eq("location", Value::point(1.0, 2.0)).build();
        assert_eq!(fragment, " WHERE `location`=POINT(?, ?)");
        assert_eq!(bindings, vec![Value::Double(1.0), Value::Double(2.0)]);
    }

    #[test]
    fn test_build_select_defaults() {
        let (sql, bindings) = build_select("users", &Where::new(), &FetchOptions::new());
        assert_eq!(sql, "SELECT * FROM `users`");
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_build_select_cols_and_order() {
        let options = FetchOptions::new()
            .cols(&["id", "name"])
            .order_by("name")
            .order_by_desc("id");
        let (sql, _) = build_select("users", &Where::new().eq("active", 1), &options);
        assert_eq!(
            sql,
            "SELECT `id`,`name` FROM `users` WHERE `active`=? ORDER BY `name` ASC, `id` DESC"
        );
    }

    #[test]
    fn test_build_exists() {
        let (sql, bindings) = build_exists("users", &Where::new().eq("email", "a@b.c"));
        assert_eq!(sql, "SELECT 1 FROM `users` WHERE `email`=? LIMIT 1");
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_build_count() {
        let (sql, _) = build_count("users", &Where::new(), None);
        assert_eq!(sql, "SELECT COUNT(*) AS `count` FROM `users`");

        let (sql, _) = build_count("users", &Where::new(), Some("email"));
        assert_eq!(sql, "SELECT COUNT(`email`) AS `count` FROM `users`");
    }

    #[test]
    fn test_build_insert() {
        let fields = FieldMap::new().field("name", "Alice").field("age", 30);
        let (sql, bindings) = build_insert(InsertKind::Insert, "users", &fields).unwrap();
        assert_eq!(sql, "INSERT INTO `users` (`name`,`age`) VALUES (?,?)");
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn test_build_insert_variants() {
        let fields = FieldMap::new().field("name", "Alice");
        let (sql, _) = build_insert(InsertKind::Ignore, "users", &fields).unwrap();
        assert!(sql.starts_with("INSERT IGNORE INTO `users`"));

        let (sql, _) = build_insert(InsertKind::Replace, "users", &fields).unwrap();
        assert!(sql.starts_with("REPLACE INTO `users`"));
    }

    #[test]
    fn test_build_insert_empty_fields_fails() {
        let err = build_insert(InsertKind::Insert, "users", &FieldMap::new()).unwrap_err();
        assert!(matches!(err, DatabaseError::Validation(_)));
    }

    #[test]
    fn test_build_insert_point_placeholder() {
        let fields = FieldMap::new()
            .field("name", "hq")
            .field("location", Value::point(-73.99, 40.73));
        let (sql, bindings) = build_insert(InsertKind::Insert, "offices", &fields).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `offices` (`name`,`location`) VALUES (?,POINT(?, ?))"
        );
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn test_build_update() {
        let fields = FieldMap::new().field("is_active", 0);
        let (sql, bindings) =
            build_update("users", &fields, &Where::new().eq("id", 7)).unwrap();
        assert_eq!(sql, "UPDATE `users` SET `is_active`=? WHERE `id`=?");
        assert_eq!(bindings, vec![Value::Int(0), Value::Int(7)]);
    }

    #[test]
    fn test_build_delete() {
        let (sql, bindings) = build_delete("sessions", &Where::new().eq("user_id", 3));
        assert_eq!(sql, "DELETE FROM `sessions` WHERE `user_id`=?");
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("weird`name"), "`weird``name`");
    }
}
