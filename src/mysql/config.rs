//! Connection configuration
//!
//! Connection parameters come from the embedding application; `from_env`
//! covers the conventional `MYSQL_*` variables. Sessions are always pinned to
//! UTC so date-time values round-trip without timezone drift.

use crate::core::error::{DatabaseError, Result};
use mysql_async::{Opts, OptsBuilder, PoolConstraints, PoolOpts};

/// MySQL connection configuration
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    host: String,
    port: u16,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
    pool_min: usize,
    pool_max: usize,
}

impl Default for MySqlConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: None,
            password: None,
            database: None,
            pool_min: 1,
            pool_max: 16,
        }
    }
}

impl MySqlConfig {
    /// Create a configuration with default host/port and pool bounds
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `MYSQL_HOST`, `MYSQL_PORT`, `MYSQL_USER`,
    /// `MYSQL_PASSWORD` and `MYSQL_DATABASE`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("MYSQL_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("MYSQL_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        config.user = std::env::var("MYSQL_USER").ok();
        config.password = std::env::var("MYSQL_PASSWORD").ok();
        config.database = std::env::var("MYSQL_DATABASE").ok();
        config
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user name
    pub fn user<S: Into<String>>(mut self, user: S) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password
    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database name
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Bound the connection pool
    pub fn pool_bounds(mut self, min: usize, max: usize) -> Self {
        self.pool_min = min;
        self.pool_max = max;
        self
    }

    /// Build driver options (UTC session timezone, bounded pool)
    pub(crate) fn to_opts(&self) -> Result<Opts> {
        let constraints = PoolConstraints::new(self.pool_min, self.pool_max).ok_or_else(|| {
            DatabaseError::connection(format!(
                "invalid pool bounds: min {} must not exceed max {}",
                self.pool_min, self.pool_max
            ))
        })?;

        let builder = OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port)
            .user(self.user.clone())
            .pass(self.password.clone())
            .db_name(self.database.clone())
            .init(vec!["SET time_zone = '+00:00'".to_string()])
            .pool_opts(PoolOpts::default().with_constraints(constraints));

        Ok(Opts::from(builder))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let config = MySqlConfig::new()
            .host("db.internal")
            .port(3307)
            .user("app")
            .password("secret")
            .database("main")
            .pool_bounds(2, 8);

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 3307);
        assert_eq!(config.database.as_deref(), Some("main"));
        assert!(config.to_opts().is_ok());
    }

    #[test]
    fn test_invalid_pool_bounds() {
        let config = MySqlConfig::new().pool_bounds(10, 2);
        assert!(config.to_opts().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = MySqlConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3306);
        assert!(config.to_opts().is_ok());
    }
}
