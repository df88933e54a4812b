//! Tunable routing policy.
//!
//! All thresholds were tuned empirically for a consumer P2P deployment and are
//! exposed here rather than baked into the algorithms.

use std::time::Duration;

use crate::domain::errors::ConfigError;

/// Route table and bucket configuration.
///
/// # Network-class gating
///
/// `max_network_class_ratio` limits how many active contacts of one bucket may
/// share the masked IPv4 prefix given by `network_class_mask`. The limit is
/// `max(1, ceil(ratio * k))`. A ratio of `1.0` or more disables the check.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTableConfig {
    /// Bucket capacity (default: 20)
    pub k: usize,
    /// Replacement cache capacity per bucket (default: 16)
    pub max_cache_size: usize,
    /// Share of `k` one network class may occupy (default: 0.1)
    pub max_network_class_ratio: f32,
    /// Mask applied to IPv4 addresses to derive the network class (default: /24)
    pub network_class_mask: u32,
    /// Depth below the local subtree after which splitting stops (default: 4)
    pub depth_limit: usize,
    /// A bucket untouched for this long is refreshed (default: 30 min)
    pub bucket_refresh_period: Duration,
    /// Minimum bucket idle time before a cache hit pings the LRS contact (default: 30 s)
    pub bucket_ping_limit: Duration,
    /// Failures accepted without an intervening successful add (default: 100)
    pub max_consecutive_failures: u32,
    /// Trust the advertised contact IP instead of the observed source IP (default: false)
    pub accept_forced_address: bool,
}

impl Default for RouteTableConfig {
    fn default() -> Self {
        Self {
            k: 20,
            max_cache_size: 16,
            max_network_class_ratio: 0.1,
            network_class_mask: 0xFFFF_FF00,
            depth_limit: 4,
            bucket_refresh_period: Duration::from_secs(30 * 60),
            bucket_ping_limit: Duration::from_secs(30),
            max_consecutive_failures: 100,
            accept_forced_address: false,
        }
    }
}

impl RouteTableConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self {
            k: 4,
            max_cache_size: 4,
            max_network_class_ratio: 1.0, // unrestricted unless a test opts in
            network_class_mask: 0xFFFF_FF00,
            depth_limit: 4,
            bucket_refresh_period: Duration::from_secs(60),
            bucket_ping_limit: Duration::from_secs(5),
            max_consecutive_failures: 100,
            accept_forced_address: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::Invalid {
                field: "k",
                reason: "bucket capacity must be at least 1".into(),
            });
        }
        if self.max_network_class_ratio.is_nan() || self.max_network_class_ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "max_network_class_ratio",
                reason: format!("must be positive, got {}", self.max_network_class_ratio),
            });
        }
        if self.depth_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "depth_limit",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Liveness policy applied to individual contacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactPolicy {
    /// Failures before a contact that was once alive is declared dead (default: 4)
    pub max_alive_failures: u32,
    /// Failures before a never-confirmed contact is declared dead (default: 2)
    pub max_unknown_failures: u32,
    /// Failure count at which a dead contact is never returned by `select` (default: 20)
    pub max_accept_failures: u32,
    /// Window in which a contact counts as recently alive (default: 30 s)
    pub min_reconnection_time: Duration,
    /// Request timeout when no RTT estimate exists (default: 10 s)
    pub default_timeout: Duration,
    /// Lower bound for RTT-derived timeouts (default: 1 s)
    pub min_timeout: Duration,
    /// Multiplier applied to the RTT estimate (default: 2)
    pub rtt_factor: u32,
}

impl Default for ContactPolicy {
    fn default() -> Self {
        Self {
            max_alive_failures: 4,
            max_unknown_failures: 2,
            max_accept_failures: 20,
            min_reconnection_time: Duration::from_secs(30),
            default_timeout: Duration::from_secs(10),
            min_timeout: Duration::from_secs(1),
            rtt_factor: 2,
        }
    }
}

impl ContactPolicy {
    pub fn for_testing() -> Self {
        Self {
            max_alive_failures: 2,
            max_unknown_failures: 1,
            max_accept_failures: 4,
            min_reconnection_time: Duration::from_secs(10),
            default_timeout: Duration::from_secs(1),
            min_timeout: Duration::from_millis(100),
            rtt_factor: 2,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_alive_failures == 0 || self.max_unknown_failures == 0 {
            return Err(ConfigError::Invalid {
                field: "max_alive_failures",
                reason: "failure thresholds must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Bucket refresher schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RefresherConfig {
    /// Delay between ticks (default: 1 min)
    pub delay: Duration,
    /// Add a uniformly random extra delay (0..delay) before the first tick (default: true)
    pub uniform_jitter: bool,
    /// Ping the nearest contacts not heard from within this window before a
    /// refresh pass. `None` disables the pre-emptive ping (default: 5 min)
    pub ping_nearest: Option<Duration>,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(60),
            uniform_jitter: true,
            ping_nearest: Some(Duration::from_secs(5 * 60)),
        }
    }
}

impl RefresherConfig {
    pub fn for_testing() -> Self {
        Self {
            delay: Duration::from_secs(1),
            uniform_jitter: false,
            ping_nearest: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay.is_zero() {
            return Err(ConfigError::Invalid {
                field: "delay",
                reason: "refresher delay must be non-zero".into(),
            });
        }
        Ok(())
    }
}

/// Everything the routing core can be configured with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingConfig {
    pub route_table: RouteTableConfig,
    pub contact: ContactPolicy,
    pub refresher: RefresherConfig,
}

impl RoutingConfig {
    pub fn for_testing() -> Self {
        Self {
            route_table: RouteTableConfig::for_testing(),
            contact: ContactPolicy::for_testing(),
            refresher: RefresherConfig::for_testing(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.route_table.validate()?;
        self.contact.validate()?;
        self.refresher.validate()
    }
}
