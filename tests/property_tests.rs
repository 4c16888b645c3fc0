//! Property-based tests for values, the WHERE builder, and dirty tracking

use mysql_record_system::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;

// ============================================================================
// Value Roundtrip Tests
// ============================================================================

proptest! {
    /// Bool values roundtrip correctly
    #[test]
    fn test_bool_roundtrip(value in any::<bool>()) {
        let val = Value::from(value);
        prop_assert_eq!(val.as_bool(), Some(value));
        prop_assert!(!val.is_null());
        prop_assert_eq!(val.type_name(), "bool");
    }

    /// Int values roundtrip correctly
    #[test]
    fn test_int_roundtrip(value in any::<i64>()) {
        let val = Value::from(value);
        prop_assert_eq!(val.as_int(), Some(value));
        prop_assert_eq!(val.type_name(), "int");
    }

    /// Double values roundtrip correctly (excluding NaN and infinities)
    #[test]
    fn test_double_roundtrip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let val = Value::from(value);
        prop_assert_eq!(val.as_double(), Some(value));
        prop_assert_eq!(val.type_name(), "double");
    }

    /// String values roundtrip correctly
    #[test]
    fn test_string_roundtrip(value in ".*") {
        let val = Value::from(value.clone());
        prop_assert_eq!(val.as_string(), value);
        prop_assert_eq!(val.type_name(), "string");
    }
}

// ============================================================================
// WHERE Builder Tests
// ============================================================================

proptest! {
    /// The fragment's placeholder count always equals the binding count
    #[test]
    fn test_where_placeholder_count_matches_bindings(
        eqs in prop::collection::vec(any::<i64>(), 0..5),
        ins in prop::collection::vec(prop::collection::vec(any::<i64>(), 0..4), 0..3),
        nulls in 0usize..3,
    ) {
        let mut spec = Where::new();
        for (i, v) in eqs.iter().enumerate() {
            spec = spec.eq(&format!("eq_{i}"), *v);
        }
        for (i, values) in ins.iter().enumerate() {
            spec = spec.is_in(&format!("in_{i}"), values.clone());
        }
        for i in 0..nulls {
            spec = spec.is_null(&format!("null_{i}"));
        }

        let (fragment, bindings) = spec.build();
        let placeholders = fragment.matches('?').count();
        prop_assert_eq!(placeholders, bindings.len());
    }

    /// An IN list binds exactly its values, in order
    #[test]
    fn test_where_in_bindings_preserve_order(values in prop::collection::vec(any::<i64>(), 1..8)) {
        let (fragment, bindings) = Where::new().is_in("id", values.clone()).build();

        prop_assert_eq!(fragment.matches('?').count(), values.len());
        let expected: Vec<Value> = values.into_iter().map(Value::from).collect();
        prop_assert_eq!(bindings, expected);
    }
}

// ============================================================================
// Dirty Tracking Tests
// ============================================================================

/// One mutation against a record under test
#[derive(Debug, Clone)]
enum Op {
    Set(usize, i64),
    Remove(usize),
}

const FIELDS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..FIELDS.len(), any::<i64>()).prop_map(|(f, v)| Op::Set(f, v)),
        (0..FIELDS.len()).prop_map(Op::Remove),
    ]
}

proptest! {
    /// After any mutation sequence, a field is tracked as dirty exactly when
    /// its current value differs from the value it started with (an absent
    /// field counts as Null).
    #[test]
    fn test_dirty_tracking_invariant(
        initial in prop::collection::vec(any::<i64>(), FIELDS.len()),
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut fields = FieldMap::new();
        let mut reference: HashMap<&str, Value> = HashMap::new();
        for (name, value) in FIELDS.iter().zip(initial.iter()) {
            fields.insert(*name, *value);
            reference.insert(*name, Value::Int(*value));
        }
        let starting = reference.clone();

        let mut record = Record::new("rows", fields);
        for op in ops {
            match op {
                Op::Set(f, v) => {
                    record.set(FIELDS[f], v);
                    reference.insert(FIELDS[f], Value::Int(v));
                }
                Op::Remove(f) => {
                    record.remove(FIELDS[f]);
                    reference.insert(FIELDS[f], Value::Null);
                }
            }
        }

        for field in FIELDS {
            let expected_dirty = reference[field] != starting[field];
            prop_assert_eq!(
                record.is_field_dirty(field),
                expected_dirty,
                "field {} expected dirty={}",
                field,
                expected_dirty
            );

            if expected_dirty {
                // the tracked original is always the starting value, no
                // matter how many times the field changed in between
                prop_assert_eq!(record.original_of(field), Some(&starting[field]));
            }
        }

        prop_assert_eq!(record.is_dirty(), FIELDS.iter().any(|f| reference[f] != starting[f]));
    }

    /// dirty() lists exactly the diverged fields with their current values
    #[test]
    fn test_dirty_set_contents(
        ops in prop::collection::vec(op_strategy(), 0..20),
    ) {
        let mut fields = FieldMap::new();
        for name in FIELDS {
            fields.insert(name, 0i64);
        }
        let mut record = Record::new("rows", fields);

        for op in ops {
            match op {
                Op::Set(f, v) => record.set(FIELDS[f], v),
                Op::Remove(f) => { record.remove(FIELDS[f]); }
            }
        }

        let dirty = record.dirty();
        for field in FIELDS {
            prop_assert_eq!(dirty.contains_key(field), record.is_field_dirty(field));
            if let Some(value) = dirty.get(field) {
                let current = record.get(field).cloned().unwrap_or(Value::Null);
                prop_assert_eq!(value, &current);
            }
        }
    }
}
