//! Router configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Effective connection class, modeled after the Network Information API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionClass {
    /// Wired or fast wifi
    Broadband,
    /// Typical cellular
    FourG,
    /// Slow cellular
    ThreeG,
    /// Very slow cellular
    TwoG,
    /// Worst case
    Slow2g,
}

impl Default for ConnectionClass {
    fn default() -> Self {
        ConnectionClass::Broadband
    }
}

/// Network conditions reported by the host at startup
///
/// Prefetching is disabled entirely on save-data or low-bandwidth
/// connections; the check runs once when the scheduler is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// User has requested reduced data usage
    pub save_data: bool,
    /// Effective connection class
    pub class: ConnectionClass,
}

impl ConnectionProfile {
    /// Whether background prefetching is permitted on this connection
    pub fn allows_prefetch(&self) -> bool {
        if self.save_data {
            return false;
        }
        !matches!(self.class, ConnectionClass::TwoG | ConnectionClass::Slow2g)
    }

    /// Flag the connection as save-data
    pub fn with_save_data(mut self, save_data: bool) -> Self {
        self.save_data = save_data;
        self
    }

    /// Set the connection class
    pub fn with_class(mut self, class: ConnectionClass) -> Self {
        self.class = class;
        self
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Base URL all page paths resolve against
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Enable compression
    pub compression: bool,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            compression: true,
            user_agent: format!("waypost/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// Create a config for the given site base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Prefetch scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Maximum concurrent background fetches drained from the queue
    pub max_concurrent: usize,
    /// Hover dwell before a pointer-over triggers a fetch
    pub hover_dwell: Duration,
    /// Deferral between `start()` and the triggers arming; stands in for
    /// an idle callback so prefetching never competes with host startup
    pub startup_deferral: Duration,
    /// Deferral before a scheduled queue drain runs
    pub drain_deferral: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            hover_dwell: Duration::from_millis(200),
            startup_deferral: Duration::from_secs(1),
            drain_deferral: Duration::ZERO,
        }
    }
}

impl PrefetchConfig {
    /// Set the concurrency bound for queue-drained fetches
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the hover dwell duration
    pub fn with_hover_dwell(mut self, dwell: Duration) -> Self {
        self.hover_dwell = dwell;
        self
    }

    /// Set the startup deferral
    pub fn with_startup_deferral(mut self, deferral: Duration) -> Self {
        self.startup_deferral = deferral;
        self
    }
}

/// Top-level router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Site origin; links outside it are never intercepted
    pub origin: String,
    /// Prefetch scheduler configuration
    pub prefetch: PrefetchConfig,
    /// Connection conditions reported by the host
    pub connection: ConnectionProfile,
}

impl RouterConfig {
    /// Create a config for the given site origin
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            prefetch: PrefetchConfig::default(),
            connection: ConnectionProfile::default(),
        }
    }

    /// Set the prefetch configuration
    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Set the connection profile
    pub fn with_connection(mut self, connection: ConnectionProfile) -> Self {
        self.connection = connection;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefetch_defaults() {
        let config = PrefetchConfig::default();

        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.hover_dwell, Duration::from_millis(200));
    }

    #[test]
    fn broadband_allows_prefetch() {
        assert!(ConnectionProfile::default().allows_prefetch());
    }

    #[test]
    fn save_data_disables_prefetch() {
        let profile = ConnectionProfile::default().with_save_data(true);
        assert!(!profile.allows_prefetch());
    }

    #[test]
    fn slow_classes_disable_prefetch() {
        for class in [ConnectionClass::TwoG, ConnectionClass::Slow2g] {
            let profile = ConnectionProfile::default().with_class(class);
            assert!(!profile.allows_prefetch());
        }
        let profile = ConnectionProfile::default().with_class(ConnectionClass::ThreeG);
        assert!(profile.allows_prefetch());
    }

    #[test]
    fn router_config_builders() {
        let config = RouterConfig::new("https://example.org")
            .with_prefetch(PrefetchConfig::default().with_max_concurrent(5));

        assert_eq!(config.origin, "https://example.org");
        assert_eq!(config.prefetch.max_concurrent, 5);
    }
}
