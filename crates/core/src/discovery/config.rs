//! Discovery configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for feed discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Enable/disable the background discovery loop.
    /// When disabled, cycles only run when triggered through the API.
    #[serde(default)]
    pub enabled: bool,

    /// RSS feed announcing releases.
    #[serde(default)]
    pub feed_url: String,

    /// Minutes between cycles. Cycles run on wall-clock multiples of this
    /// interval (e.g. :00, :15, :30, :45) and time out after one interval.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// User-Agent sent to the feed host.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Feed request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Catalog lookups in flight at once.
    #[serde(default = "default_match_concurrency")]
    pub match_concurrency: usize,
}

fn default_interval_minutes() -> u32 {
    15
}

fn default_user_agent() -> String {
    concat!("animerate/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_match_concurrency() -> usize {
    4
}

impl DiscoveryConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            feed_url: String::new(),
            interval_minutes: default_interval_minutes(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            match_concurrency: default_match_concurrency(),
        }
    }
}
