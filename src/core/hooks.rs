//! Save lifecycle hooks
//!
//! Hooks are registered once at application bootstrap, either globally or for
//! a single table, and live for the process lifetime. Dispatch for a save runs
//! every global hook first, then the table's hooks, each in registration
//! order, each awaited before the next begins.

use super::error::Result;
use super::record::Record;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Which save callback to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Before the UPDATE is issued
    BeforeSave,
    /// After the UPDATE succeeded
    OnSave,
}

/// A save lifecycle observer.
///
/// Both callbacks default to no-ops, so implementors override only the ones
/// they care about. A returned error aborts the enclosing save before any
/// later hook runs.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Runs before the UPDATE of a dirty record is issued
    async fn before_save(&self, _record: &mut Record) -> Result<()> {
        Ok(())
    }

    /// Runs after the UPDATE of a dirty record succeeded
    async fn on_save(&self, _record: &mut Record) -> Result<()> {
        Ok(())
    }
}

/// Append-only registry of global and per-table hooks
#[derive(Default)]
pub struct HookRegistry {
    global: RwLock<Vec<Arc<dyn Hook>>>,
    by_table: RwLock<HashMap<String, Vec<Arc<dyn Hook>>>>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook globally (`table` = `None`) or for one table
    pub fn add_hook(&self, table: Option<&str>, hook: Arc<dyn Hook>) {
        match table {
            None => self.global.write().push(hook),
            Some(table) => self
                .by_table
                .write()
                .entry(table.to_lowercase())
                .or_default()
                .push(hook),
        }
    }

    /// Snapshot the hooks that apply to a table: globals first, then the
    /// table's own, each group in registration order
    fn hooks_for(&self, table: &str) -> Vec<Arc<dyn Hook>> {
        let mut hooks: Vec<Arc<dyn Hook>> = self.global.read().iter().cloned().collect();
        if let Some(table_hooks) = self.by_table.read().get(&table.to_lowercase()) {
            hooks.extend(table_hooks.iter().cloned());
        }
        hooks
    }

    /// Dispatch one action across all applicable hooks, sequentially awaited.
    /// The first error aborts the remainder.
    pub async fn dispatch(
        &self,
        table: &str,
        action: HookAction,
        record: &mut Record,
    ) -> Result<()> {
        for hook in self.hooks_for(table) {
            match action {
                HookAction::BeforeSave => hook.before_save(record).await?,
                HookAction::OnSave => hook.on_save(record).await?,
            }
        }
        Ok(())
    }
}
