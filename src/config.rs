//! Configuration — an explicit, documented-default snapshot resolved once
//! at startup from environment variables (via `dotenvy`), not a reflection
//! framework populating structured fields at arbitrary points in the
//! program's life.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `server.address`
    pub address: String,
    /// `server.mode` — "debug" (verbose logs) or "production" (compact logs).
    pub mode: ServerMode,
    /// `server.read_timeout`
    pub read_timeout: Duration,
    /// `server.write_timeout`
    pub write_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    Debug,
    Production,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `database.url`
    pub url: String,
    /// `database.max_conns`
    pub max_conns: u32,
    /// `database.min_conns`
    pub min_conns: u32,
    /// `database.max_lifetime`
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// `cache.max_size`
    pub max_size: usize,
    /// `cache.ttl` — TTL for the `Today` recency class (1h-24h old).
    pub default_ttl: Duration,
    /// `cache.historical_ttl` — TTL for the `Historical` recency class (>24h old).
    pub historical_ttl: Duration,
    /// `cache.recent_ttl` — TTL for the `Recent` recency class (<=1h old).
    pub recent_ttl: Duration,
}

impl CacheConfig {
    /// Convert into the `TtlClass -> Duration` policy `SmartQuery` applies
    /// on every cache insert, so the three `cache.*_ttl` options actually
    /// take effect instead of the Cache falling back to hardcoded defaults.
    pub fn ttl_policy(&self) -> crate::cache::CacheTtlPolicy {
        crate::cache::CacheTtlPolicy {
            recent: self.recent_ttl,
            today: self.default_ttl,
            historical: self.historical_ttl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataConfig {
    /// `data.max_points`
    pub max_points: i64,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub job_deadline: Duration,
    pub job_retention: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub data: DataConfig,
}

impl AppConfig {
    /// Resolve configuration from the process environment. `dotenvy::dotenv`
    /// is expected to have already loaded a `.env` file, if present, before
    /// this is called (see `main`).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                address: env_string("SERVER_ADDRESS", "0.0.0.0:3000"),
                mode: match env_string("SERVER_MODE", "debug").as_str() {
                    "production" => ServerMode::Production,
                    _ => ServerMode::Debug,
                },
                read_timeout: env_secs("SERVER_READ_TIMEOUT_SECS", 10),
                write_timeout: env_secs("SERVER_WRITE_TIMEOUT_SECS", 10),
            },
            database: DatabaseConfig {
                url: env_string("DATABASE_URL", "postgres://localhost/candle_core"),
                max_conns: env_parsed("DATABASE_MAX_CONNS", 20),
                min_conns: env_parsed("DATABASE_MIN_CONNS", 2),
                max_lifetime: env_secs("DATABASE_MAX_LIFETIME_SECS", 1_800),
                acquire_timeout: env_secs("DATABASE_ACQUIRE_TIMEOUT_SECS", 5),
            },
            cache: CacheConfig {
                max_size: env_parsed("CACHE_MAX_SIZE", 10_000),
                default_ttl: env_secs("CACHE_TTL_SECS", 60),
                historical_ttl: env_secs("CACHE_HISTORICAL_TTL_SECS", 300),
                recent_ttl: env_secs("CACHE_RECENT_TTL_SECS", 10),
            },
            data: DataConfig {
                max_points: env_parsed("DATA_MAX_POINTS", 10_000),
                worker_count: env_parsed("DATA_WORKER_COUNT", 3),
                queue_capacity: env_parsed("DATA_QUEUE_CAPACITY", 256),
                job_deadline: env_secs("DATA_JOB_DEADLINE_SECS", 600),
                job_retention: env_secs("DATA_JOB_RETENTION_SECS", 900),
            },
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_parsed(key, default_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_when_no_env_is_set() {
        // SAFETY-free: just reads defaults for keys unlikely to be set in CI.
        std::env::remove_var("CACHE_MAX_SIZE");
        let config = AppConfig::from_env();
        assert_eq!(config.cache.max_size, 10_000);
        assert_eq!(config.data.max_points, 10_000);
        assert_eq!(config.server.mode, ServerMode::Debug);
    }
}
