//! PostgreSQL pool bootstrap
//!
//! `DbConfig` gathers pool sizing and timeouts (overridable through `DB_*`
//! variables); `create_pool` opens the pool and proves it with a round trip
//! before the service starts taking traffic.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct DbConfig {
    /// Used as the `service` field of every log line
    pub service_name: String,
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Waiting time for a free connection before `PoolTimedOut`
    pub acquire_timeout: Duration,
    /// Budget for the startup `SELECT 1`
    pub verify_timeout: Duration,
    pub idle_timeout: Duration,
}

// The URL may embed credentials.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("verify_timeout", &self.verify_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl DbConfig {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;

    /// Pool settings for `service_name`. Sizing and timeouts come from
    /// `DB_MAX_CONNECTIONS`, `DB_MIN_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS`,
    /// `DB_VERIFY_TIMEOUT_SECS` and `DB_IDLE_TIMEOUT_SECS` when they parse.
    pub fn new(service_name: &str, database_url: impl Into<String>) -> Self {
        Self {
            service_name: service_name.to_string(),
            database_url: database_url.into(),
            max_connections: env_or("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS),
            min_connections: env_or("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS),
            acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)),
            verify_timeout: Duration::from_secs(env_or("DB_VERIFY_TIMEOUT_SECS", 5)),
            idle_timeout: Duration::from_secs(env_or("DB_IDLE_TIMEOUT_SECS", 600)),
        }
    }

    /// Raise the pool ceiling; never lowers an env-provided value.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = self.max_connections.max(max_connections);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout = ?self.acquire_timeout,
            idle_timeout = ?self.idle_timeout,
            "database pool configuration"
        );
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Open the pool and run `SELECT 1` within `verify_timeout`.
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .test_before_acquire(true)
        .connect(&config.database_url)
        .await?;

    let verified = tokio::time::timeout(
        config.verify_timeout,
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await;

    match verified {
        Ok(Ok(_)) => {
            info!(service = %config.service_name, "database pool ready");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(service = %config.service_name, error = %e, "database verification failed");
            pool.close().await;
            Err(e)
        }
        Err(_) => {
            error!(
                service = %config.service_name,
                timeout = ?config.verify_timeout,
                "database verification timed out"
            );
            pool.close().await;
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 5] = [
        "DB_MAX_CONNECTIONS",
        "DB_MIN_CONNECTIONS",
        "DB_ACQUIRE_TIMEOUT_SECS",
        "DB_VERIFY_TIMEOUT_SECS",
        "DB_IDLE_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_new_uses_defaults() {
        clear_env();

        let config = DbConfig::new("blog-service", "postgres://localhost/blog");
        assert_eq!(config.service_name, "blog-service");
        assert_eq!(config.database_url, "postgres://localhost/blog");
        assert_eq!(config.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DbConfig::DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_and_ignores_garbage() {
        clear_env();
        std::env::set_var("DB_MAX_CONNECTIONS", "40");
        std::env::set_var("DB_MIN_CONNECTIONS", "not-a-number");

        let config = DbConfig::new("blog-service", "postgres://localhost/blog");
        assert_eq!(config.max_connections, 40);
        assert_eq!(config.min_connections, DbConfig::DEFAULT_MIN_CONNECTIONS);

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_with_max_connections_only_raises() {
        clear_env();
        std::env::set_var("DB_MAX_CONNECTIONS", "30");

        let config = DbConfig::new("blog-service", "postgres://x").with_max_connections(12);
        assert_eq!(config.max_connections, 30);

        clear_env();
        let config = DbConfig::new("blog-service", "postgres://x").with_max_connections(25);
        assert_eq!(config.max_connections, 25);
    }

    #[test]
    #[serial_test::serial]
    fn test_debug_redacts_url() {
        clear_env();
        let config = DbConfig::new("blog-service", "postgres://user:secret@db/blog");
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("secret"));
    }
}
