//! Attached database configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool sizing and result limits applied to every attached database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum pooled connections per attached database.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection (including the first connect).
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Maximum rows materialized from a generated query.
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            max_result_rows: default_max_result_rows(),
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_max_result_rows() -> usize {
    500
}
