//! Host provider client configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the HTTP client talking to the host provider.
///
/// Endpoint and account come from the environment's `HOST_PROVIDER`
/// credential, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostProviderConfig {
    /// Per-request timeout in seconds, enforced by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl HostProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for HostProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}
