use std::str::FromStr;

use gateway::types::PoolId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Scheduler tick cadence.
    pub tick_interval_ms: u64,

    /// Retry budget per withdrawal before it goes terminal.
    pub max_retries: u32,

    /// Flat delay before a failed withdrawal becomes due again.
    pub retry_delay_ms: u64,

    /// Pools the catalog tracks.
    pub pool_ids: Vec<PoolId>,

    /// Pool catalog refresh cadence.
    pub catalog_refresh_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("TUMBLER_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tumbler.db?mode=rwc".to_string());

        Self {
            database_url,
            tick_interval_ms: env_or("TUMBLER_TICK_MS", 10_000),
            max_retries: env_or("TUMBLER_MAX_RETRIES", 3),
            retry_delay_ms: env_or("TUMBLER_RETRY_DELAY_MS", 300_000),
            pool_ids: parse_pool_ids(
                &std::env::var("TUMBLER_POOLS").unwrap_or_else(|_| "0,1,2,3".to_string()),
            ),
            catalog_refresh_ms: env_or("TUMBLER_CATALOG_REFRESH_MS", 60_000),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_pool_ids(raw: &str) -> Vec<PoolId> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}
