//! Session configuration.
//!
//! The read deadline is the liveness window of a connection: it slides forward
//! every time the peer answers a ping. Pings go out every `ping_interval_secs`,
//! which must stay below the deadline so a dead peer is noticed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Keepalive timings and queue sizes for a live session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds without a pong before the connection is considered dead.
    #[serde(default = "default_read_deadline_secs")]
    pub read_deadline_secs: u64,

    /// Seconds between keepalive pings.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// Capacity of the inbound (reader → dispatcher) queue.
    #[serde(default = "default_capacity")]
    pub inbound_capacity: usize,

    /// Capacity of the outbound (dispatcher → writer) queue.
    #[serde(default = "default_capacity")]
    pub outbound_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_deadline_secs: default_read_deadline_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            inbound_capacity: default_capacity(),
            outbound_capacity: default_capacity(),
        }
    }
}

impl SessionConfig {
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

fn default_read_deadline_secs() -> u64 {
    60
}

fn default_ping_interval_secs() -> u64 {
    50
}

fn default_capacity() -> usize {
    256
}
