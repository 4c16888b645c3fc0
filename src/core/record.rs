//! Dirty-tracked live representation of one database row
//!
//! A [`Record`] holds two ordered field maps: the current (possibly mutated)
//! state and the original values of fields that have diverged from the state
//! first read or last saved. A field is tracked in `original` exactly while
//! its current value differs from that first-seen value; setting a field back
//! to its original value reconciles it and drops the tracking entry.
//!
//! Saving goes through the database façade or a transaction (see
//! [`MySqlDatabase::save`] and [`Transaction::save`]), which persist only the
//! dirty fields.
//!
//! [`MySqlDatabase::save`]: crate::mysql::MySqlDatabase::save
//! [`Transaction::save`]: crate::mysql::Transaction::save

use super::query_builder::Where;
use super::value::{FieldMap, Value};
use std::collections::HashMap;

/// Old/new pair for one dirty field; `new` is `None` for a removed field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDiff {
    pub old: Value,
    pub new: Option<Value>,
}

/// In-memory, dirty-tracked representation of one row of one table
#[derive(Debug, Clone, Default)]
pub struct Record {
    table: String,
    current: FieldMap,
    original: FieldMap,
    scratch: HashMap<String, Value>,
}

impl Record {
    /// Wrap already-decoded fields as a clean record
    pub fn new(table: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            table: table.into(),
            current: fields,
            original: FieldMap::new(),
            scratch: HashMap::new(),
        }
    }

    /// Owning table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read a field's current value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.current.get(field)
    }

    /// Check whether a field is currently present
    pub fn contains(&self, field: &str) -> bool {
        self.current.contains_key(field)
    }

    /// Iterate current field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.current.keys()
    }

    /// Write a field.
    ///
    /// Writing the current value is a no-op. Writing the tracked original
    /// value reconciles the field (it is no longer dirty). Otherwise the
    /// first-seen prior value is captured before overwriting; a field that is
    /// already dirty keeps its first original, never the most recent value.
    /// An absent field's prior value is recorded as [`Value::Null`].
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        let value = value.into();
        let current = self.current.get(field).cloned().unwrap_or(Value::Null);
        if current == value {
            return;
        }

        match self.original.get(field) {
            Some(original) if *original == value => {
                self.original.remove(field);
                self.current.insert(field, value);
            }
            Some(_) => {
                self.current.insert(field, value);
            }
            None => {
                self.original.insert(field, current);
                self.current.insert(field, value);
            }
        }
    }

    /// Remove a field, recording its prior value as the original if the field
    /// is not already tracked (the first original wins). Saving a removed
    /// field writes SQL `NULL`.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let prior = self.current.remove(field);
        if let Some(ref value) = prior {
            if self.original.get(field).is_none() {
                self.original.insert(field, value.clone());
            }
        }
        prior
    }

    /// Copy of all current fields
    pub fn plain(&self) -> FieldMap {
        self.current.clone()
    }

    /// Copy of the named current fields, in the given order
    pub fn plain_subset(&self, fields: &[&str]) -> FieldMap {
        let mut out = FieldMap::with_capacity(fields.len());
        for field in fields {
            if let Some(value) = self.current.get(field) {
                out.insert(*field, value.clone());
            }
        }
        out
    }

    /// Primary-key projection as a WHERE specification (`{id}`)
    pub fn key(&self) -> Where {
        let id = self.current.get("id").cloned().unwrap_or(Value::Null);
        Where::new().eq("id", id)
    }

    /// Current primary-key value, if present
    pub fn id(&self) -> Option<&Value> {
        self.current.get("id")
    }

    /// All tracked original values
    pub fn original(&self) -> &FieldMap {
        &self.original
    }

    /// Tracked original value of one field, if it is dirty
    pub fn original_of(&self, field: &str) -> Option<&Value> {
        self.original.get(field)
    }

    /// True if any field is dirty
    pub fn is_dirty(&self) -> bool {
        !self.original.is_empty()
    }

    /// True if the named field is dirty
    pub fn is_field_dirty(&self, field: &str) -> bool {
        self.original.contains_key(field)
    }

    /// Dirty field -> current value (removed fields map to [`Value::Null`])
    pub fn dirty(&self) -> FieldMap {
        let mut out = FieldMap::with_capacity(self.original.len());
        for (field, _) in self.original.iter() {
            let value = self.current.get(field).cloned().unwrap_or(Value::Null);
            out.insert(field, value);
        }
        out
    }

    /// Dirty field -> old/new pair, in tracking order
    pub fn diff(&self) -> Vec<(String, FieldDiff)> {
        self.original
            .iter()
            .map(|(field, old)| {
                (
                    field.to_string(),
                    FieldDiff {
                        old: old.clone(),
                        new: self.current.get(field).cloned(),
                    },
                )
            })
            .collect()
    }

    /// Ephemeral caller bookkeeping; never persisted
    pub fn scratch(&self) -> &HashMap<String, Value> {
        &self.scratch
    }

    /// Mutable ephemeral caller bookkeeping; never persisted
    pub fn scratch_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.scratch
    }

    /// Forget all dirty tracking (called after a successful save)
    pub(crate) fn clear_dirty(&mut self) {
        self.original = FieldMap::new();
    }
}
