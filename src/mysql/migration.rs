//! Forward-only migration runner
//!
//! Migrations are a flat directory of files whose lexicographic sort order is
//! the execution order. `.sql` files are split into statements and executed
//! one by one; `.rs` entries are markers for script migrations registered in
//! code with [`register_script`](MigrationRunner::register_script). Applied
//! names are recorded in the `_migrations` bookkeeping table, one row per
//! migration, so a failed run resumes from the failed entry.

use crate::core::error::{DatabaseError, Result};
use crate::core::value::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{error, info};

use super::database::MySqlDatabase;

const BOOKKEEPING_TABLE: &str = "_migrations";

/// A registered zero-argument script migration
pub type ScriptFn = Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Applies pending migrations from a directory, exactly once each
pub struct MigrationRunner<'a> {
    db: &'a MySqlDatabase,
    dir: PathBuf,
    scripts: HashMap<String, ScriptFn>,
}

impl<'a> MigrationRunner<'a> {
    /// Create a runner over the default `migrations` directory
    pub fn new(db: &'a MySqlDatabase) -> Self {
        Self {
            db,
            dir: PathBuf::from("migrations"),
            scripts: HashMap::new(),
        }
    }

    /// Override the migrations directory
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Bind a script migration to its `.rs` marker file name.
    ///
    /// The file's on-disk content is ignored; its name orders the script
    /// among the other migrations and keys the bookkeeping row.
    pub fn register_script<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.scripts.insert(
            name.into(),
            Box::new(move || {
                let fut: Pin<Box<dyn Future<Output = Result<()>> + Send>> = Box::pin(f());
                fut
            }),
        );
    }

    /// Apply all pending migrations in lexicographic order and return the
    /// names applied. A failure aborts the run; already-recorded migrations
    /// stay recorded, so the next run resumes from the failed entry.
    pub async fn run(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Err(DatabaseError::migration(format!(
                "migrations directory does not exist: {}",
                self.dir.display()
            )));
        }

        self.ensure_bookkeeping_table().await?;

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let rows = self
            .db
            .query(
                "SELECT `name` FROM `_migrations` ORDER BY `name`",
                Vec::new(),
            )
            .await?;
        let recorded: HashSet<String> = rows
            .into_iter()
            .filter_map(|row| row.get("name").map(Value::as_string))
            .collect();

        let mut applied = Vec::new();
        for name in pending(&names, &recorded) {
            info!(migration = %name, "running migration");

            let extension = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase);
            match extension.as_deref() {
                Some("sql") => self.run_sql_migration(&self.dir.join(name)).await?,
                Some("rs") => self.run_script_migration(name).await?,
                _ => {
                    return Err(DatabaseError::migration(format!(
                        "unsupported file type for migration: {name}"
                    )));
                }
            }

            info!(migration = %name, "completed migration");

            self.db
                .exec(
                    "INSERT INTO `_migrations` (`name`) VALUES (?)",
                    vec![Value::from(name.as_str())],
                )
                .await?;
            applied.push(name.clone());
        }

        Ok(applied)
    }

    /// Idempotent check-then-create of the bookkeeping table
    async fn ensure_bookkeeping_table(&self) -> Result<()> {
        let existing = self
            .db
            .query(&format!("SHOW TABLES LIKE '{BOOKKEEPING_TABLE}'"), Vec::new())
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        self.db
            .exec(
                "CREATE TABLE `_migrations` ( \
                 `name` varchar(255) NOT NULL DEFAULT '', \
                 PRIMARY KEY (`name`) \
                 ) ENGINE=InnoDB DEFAULT CHARSET=utf8",
                Vec::new(),
            )
            .await?;
        Ok(())
    }

    async fn run_sql_migration(&self, path: &Path) -> Result<()> {
        let blob = std::fs::read_to_string(path)?;

        for statement in split_statements(&blob) {
            if let Err(err) = self.db.exec(&statement, Vec::new()).await {
                error!(statement = %statement, "failed to execute statement");
                return Err(err);
            }
        }
        Ok(())
    }

    async fn run_script_migration(&self, name: &str) -> Result<()> {
        let script = self.scripts.get(name).ok_or_else(|| {
            DatabaseError::migration(format!(
                "migration {name} does not have a registered function"
            ))
        })?;
        script().await
    }
}

/// On-disk names not yet recorded, preserving the listing order
fn pending<'n>(on_disk: &'n [String], recorded: &HashSet<String>) -> Vec<&'n String> {
    on_disk.iter().filter(|n| !recorded.contains(*n)).collect()
}

/// Split an SQL blob into statements on top-level semicolons.
///
/// A single pass tracks whether the cursor sits inside a single-, double- or
/// backtick-quoted run; a quote character directly preceded by a backslash
/// does not terminate the run. A trailing fragment without a final semicolon
/// still counts as a statement when it is non-empty after trimming.
pub fn split_statements(blob: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut active_quote: Option<char> = None;
    let mut previous: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in blob.char_indices() {
        match active_quote {
            Some(quote) => {
                if ch == quote && previous != Some('\\') {
                    active_quote = None;
                }
            }
            None => {
                if ch == '\'' || ch == '"' || ch == '`' {
                    active_quote = Some(ch);
                } else if ch == ';' {
                    let statement = blob[start..idx].trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    start = idx + 1;
                }
            }
        }
        previous = Some(ch);
    }

    let last = blob[start..].trim();
    if !last.is_empty() {
        statements.push(last.to_string());
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::config::MySqlConfig;

    #[test]
    fn test_split_plain_statements() {
        let statements = split_statements("CREATE TABLE a (id int); INSERT INTO a VALUES (1);");
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id int)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_split_quoted_semicolons() {
        let statements = split_statements(
            "INSERT INTO t VALUES ('a;b'); INSERT INTO t VALUES ('c\\'d;e');",
        );
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "INSERT INTO t VALUES ('a;b')");
        assert_eq!(statements[1], "INSERT INTO t VALUES ('c\\'d;e')");
    }

    #[test]
    fn test_split_double_and_backtick_quotes() {
        let statements =
            split_statements("UPDATE `weird;table` SET a = \";\" ; DELETE FROM `weird;table`");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "UPDATE `weird;table` SET a = \";\"");
        assert_eq!(statements[1], "DELETE FROM `weird;table`");
    }

    #[test]
    fn test_split_trailing_fragment_without_semicolon() {
        let statements = split_statements("SELECT 1;\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_drops_blank_fragments() {
        let statements = split_statements(" ; ;SELECT 1; \n ");
        assert_eq!(statements, vec!["SELECT 1"]);
    }

    #[test]
    fn test_pending_preserves_disk_order() {
        let on_disk = vec![
            "001_init.sql".to_string(),
            "002_add_col.sql".to_string(),
            "003_backfill.rs".to_string(),
        ];
        let recorded: HashSet<String> = ["001_init.sql".to_string()].into();

        let names: Vec<&str> = pending(&on_disk, &recorded)
            .into_iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, vec!["002_add_col.sql", "003_backfill.rs"]);
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_directory() {
        // the directory check happens before any connection is needed
        let db = MySqlDatabase::new(MySqlConfig::new().database("test")).unwrap();
        let runner = MigrationRunner::new(&db).with_dir("does/not/exist");

        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, DatabaseError::Migration(_)));
        assert!(err.to_string().contains("does not exist"));
    }
}
