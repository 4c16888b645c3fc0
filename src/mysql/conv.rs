//! Conversions between core values and driver values
//!
//! The driver reports decimals, JSON documents and geometry as text or bytes;
//! those stay raw here and are given application types by the schema cache's
//! decode step, which knows the column classifications.

use crate::core::value::{FieldMap, Row, Value};
use chrono::{Datelike, NaiveDate, Timelike};

/// Convert a core value into a driver binding
pub(crate) fn to_driver_value(value: Value) -> mysql_async::Value {
    match value {
        Value::Null => mysql_async::Value::NULL,
        Value::Bool(b) => mysql_async::Value::Int(b as i64),
        Value::Int(i) => mysql_async::Value::Int(i),
        Value::Double(f) => mysql_async::Value::Double(f),
        Value::String(s) => mysql_async::Value::Bytes(s.into_bytes()),
        Value::Bytes(b) => mysql_async::Value::Bytes(b),
        Value::Date(d) => {
            mysql_async::Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0)
        }
        Value::DateTime(dt) => mysql_async::Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.and_utc().timestamp_subsec_micros(),
        ),
        Value::Json(j) => mysql_async::Value::Bytes(j.to_string().into_bytes()),
        // only reachable through raw query bindings; statement builders flatten
        // points into POINT(?, ?) coordinates before this layer
        Value::Point { x, y } => mysql_async::Value::Bytes(format!("POINT({x} {y})").into_bytes()),
    }
}

/// Convert a driver value into a core value
pub(crate) fn from_driver_value(value: mysql_async::Value) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Int(i) => Value::Int(i),
        mysql_async::Value::UInt(u) => Value::Int(u as i64),
        mysql_async::Value::Float(f) => Value::Double(f as f64),
        mysql_async::Value::Double(f) => Value::Double(f),
        mysql_async::Value::Bytes(b) => match String::from_utf8(b) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Date(year, month, day, hour, minute, second, micros) => {
            match NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32).and_then(|d| {
                d.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros)
            }) {
                Some(dt) => Value::DateTime(dt),
                // zero-dates and friends
                None => Value::Null,
            }
        }
        mysql_async::Value::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = days * 24 + hours as u32;
            Value::String(format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}"))
        }
    }
}

/// Convert a driver row into a raw column map
pub(crate) fn row_to_map(mut row: mysql_async::Row) -> Row {
    let columns = row.columns();
    let mut out = Row::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let value = row
            .take::<mysql_async::Value, usize>(i)
            .unwrap_or(mysql_async::Value::NULL);
        out.insert(column.name_str().into_owned(), from_driver_value(value));
    }
    out
}

/// Convert a driver row into ordered fields, preserving column order
pub(crate) fn row_to_fields(mut row: mysql_async::Row) -> FieldMap {
    let columns = row.columns();
    let mut out = FieldMap::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let value = row
            .take::<mysql_async::Value, usize>(i)
            .unwrap_or(mysql_async::Value::NULL);
        out.insert(column.name_str().into_owned(), from_driver_value(value));
    }
    out
}

/// First column of a driver row, for single-value results (`SHOW TABLES`)
pub(crate) fn first_column(mut row: mysql_async::Row) -> Value {
    from_driver_value(
        row.take::<mysql_async::Value, usize>(0)
            .unwrap_or(mysql_async::Value::NULL),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        assert_eq!(
            from_driver_value(to_driver_value(Value::Int(42))),
            Value::Int(42)
        );
        assert_eq!(
            from_driver_value(to_driver_value(Value::Double(1.5))),
            Value::Double(1.5)
        );
        assert_eq!(
            from_driver_value(to_driver_value(Value::String("hi".into()))),
            Value::String("hi".into())
        );
        assert_eq!(from_driver_value(to_driver_value(Value::Null)), Value::Null);
    }

    #[test]
    fn test_bool_encodes_as_int() {
        assert_eq!(to_driver_value(Value::Bool(true)), mysql_async::Value::Int(1));
        assert_eq!(to_driver_value(Value::Bool(false)), mysql_async::Value::Int(0));
    }

    #[test]
    fn test_date_maps_to_driver_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            to_driver_value(Value::Date(date)),
            mysql_async::Value::Date(2024, 3, 7, 0, 0, 0, 0)
        );
    }

    #[test]
    fn test_driver_date_decodes_as_datetime() {
        let value = from_driver_value(mysql_async::Value::Date(2024, 3, 7, 13, 45, 0, 0));
        match value {
            Value::DateTime(dt) => {
                assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-07 13:45:00");
            }
            other => panic!("expected datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_date_decodes_as_null() {
        let value = from_driver_value(mysql_async::Value::Date(0, 0, 0, 0, 0, 0, 0));
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_json_encodes_as_text() {
        let value = to_driver_value(Value::Json(serde_json::json!({"a": 1})));
        assert_eq!(
            value,
            mysql_async::Value::Bytes("{\"a\":1}".as_bytes().to_vec())
        );
    }
}
