/// Configuration management for Blog Service
///
/// Everything is read from environment variables (a `.env` file is loaded by
/// the binary beforehand). Variables from older deployments (`PORT`,
/// `POSTGRES_DSN`, `REDIS_ADDR`, `ES_ADDR`) are honoured as fallbacks.
use crate::timeout::BackendTimeouts;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Apply bundled migrations on startup
    pub run_migrations: bool,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
    pub timeout_ms: u64,
    pub max_results: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                host: std::env::var("BLOG_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default(&["BLOG_SERVICE_PORT", "PORT"], 8080)?,
                env: app_env,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: first_env(&["DATABASE_URL", "POSTGRES_DSN"])
                    .unwrap_or_else(|| "postgres://localhost/blog".to_string()),
                max_connections: parse_env_or_default(&["DATABASE_MAX_CONNECTIONS"], 10)?,
                run_migrations: parse_env_or_default(&["RUN_MIGRATIONS"], true)?,
                timeout_ms: parse_env_or_default(&["STORE_TIMEOUT_MS"], 5_000)?,
            },
            cache: CacheConfig {
                backend: parse_env_or_default(&["CACHE_BACKEND"], CacheBackend::Redis)?,
                url: first_env(&["REDIS_URL", "REDIS_ADDR"])
                    .map(|raw| redis_utils::normalize_redis_url(&raw))
                    .unwrap_or_else(|| "redis://localhost:6379".to_string()),
                timeout_ms: parse_env_or_default(&["CACHE_TIMEOUT_MS"], 250)?,
            },
            search: SearchConfig {
                url: first_env(&["ELASTICSEARCH_URL", "ES_ADDR"])
                    .unwrap_or_else(|| "http://localhost:9200".to_string()),
                index: std::env::var("SEARCH_INDEX").unwrap_or_else(|_| "posts".to_string()),
                timeout_ms: parse_env_or_default(&["SEARCH_TIMEOUT_MS"], 3_000)?,
                max_results: parse_env_or_default::<usize>(&["SEARCH_MAX_RESULTS"], 50)?
                    .clamp(1, 100),
            },
        })
    }

    pub fn timeouts(&self) -> BackendTimeouts {
        BackendTimeouts {
            store: Duration::from_millis(self.database.timeout_ms),
            cache: Duration::from_millis(self.cache.timeout_ms),
            index: Duration::from_millis(self.search.timeout_ms),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

/// Value of the first non-empty variable among `keys`.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

fn parse_env_or_default<T>(keys: &[&str], default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    for key in keys {
        if let Ok(val) = std::env::var(key) {
            if val.trim().is_empty() {
                continue;
            }
            return val
                .trim()
                .parse()
                .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e));
        }
    }
    Ok(default)
}
