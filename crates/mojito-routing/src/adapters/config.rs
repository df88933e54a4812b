use crate::domain::RoutingConfig;
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider.
///
/// Useful for testing and embedding. For deployments, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: RoutingConfig,
}

impl StaticConfigProvider {
    /// Create with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: RoutingConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn routing_config(&self) -> RoutingConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Config file loading (requires "toml-config" feature)
// ============================================================================

#[cfg(feature = "toml-config")]
mod toml_config {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use serde::Deserialize;

    use super::*;
    use crate::domain::{ConfigError, ContactPolicy, RefresherConfig, RouteTableConfig};

    /// Configuration file structure. Every field is optional and falls back
    /// to the built-in default.
    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        route_table: RouteTableSection,
        #[serde(default)]
        contact: ContactSection,
        #[serde(default)]
        refresher: RefresherSection,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct RouteTableSection {
        k: Option<usize>,
        max_cache_size: Option<usize>,
        max_network_class_ratio: Option<f32>,
        network_class_mask: Option<u32>,
        depth_limit: Option<usize>,
        bucket_refresh_period_secs: Option<u64>,
        bucket_ping_limit_secs: Option<u64>,
        max_consecutive_failures: Option<u32>,
        accept_forced_address: Option<bool>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct ContactSection {
        max_alive_failures: Option<u32>,
        max_unknown_failures: Option<u32>,
        max_accept_failures: Option<u32>,
        min_reconnection_time_secs: Option<u64>,
        default_timeout_ms: Option<u64>,
        min_timeout_ms: Option<u64>,
        rtt_factor: Option<u32>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct RefresherSection {
        delay_secs: Option<u64>,
        uniform_jitter: Option<bool>,
        /// 0 disables the pre-emptive ping.
        ping_nearest_secs: Option<u64>,
    }

    /// TOML-based configuration provider.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [route_table]
    /// k = 20
    /// max_cache_size = 16
    /// max_network_class_ratio = 0.1
    /// network_class_mask = 0xFFFFFF00
    /// depth_limit = 4
    /// bucket_refresh_period_secs = 1800
    /// bucket_ping_limit_secs = 30
    /// max_consecutive_failures = 100
    /// accept_forced_address = false
    ///
    /// [contact]
    /// max_alive_failures = 4
    /// max_unknown_failures = 2
    /// max_accept_failures = 20
    /// min_reconnection_time_secs = 30
    /// default_timeout_ms = 10000
    /// min_timeout_ms = 1000
    /// rtt_factor = 2
    ///
    /// [refresher]
    /// delay_secs = 60
    /// uniform_jitter = true
    /// ping_nearest_secs = 300
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: RoutingConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let file: ConfigFile =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

            let config = RoutingConfig {
                route_table: route_table_config(file.route_table),
                contact: contact_policy(file.contact),
                refresher: refresher_config(file.refresher),
            };
            config.validate()?;

            Ok(Self { config })
        }
    }

    fn route_table_config(s: RouteTableSection) -> RouteTableConfig {
        let d = RouteTableConfig::default();
        RouteTableConfig {
            k: s.k.unwrap_or(d.k),
            max_cache_size: s.max_cache_size.unwrap_or(d.max_cache_size),
            max_network_class_ratio: s.max_network_class_ratio.unwrap_or(d.max_network_class_ratio),
            network_class_mask: s.network_class_mask.unwrap_or(d.network_class_mask),
            depth_limit: s.depth_limit.unwrap_or(d.depth_limit),
            bucket_refresh_period: s
                .bucket_refresh_period_secs
                .map_or(d.bucket_refresh_period, Duration::from_secs),
            bucket_ping_limit: s
                .bucket_ping_limit_secs
                .map_or(d.bucket_ping_limit, Duration::from_secs),
            max_consecutive_failures: s
                .max_consecutive_failures
                .unwrap_or(d.max_consecutive_failures),
            accept_forced_address: s.accept_forced_address.unwrap_or(d.accept_forced_address),
        }
    }

    fn contact_policy(s: ContactSection) -> ContactPolicy {
        let d = ContactPolicy::default();
        ContactPolicy {
            max_alive_failures: s.max_alive_failures.unwrap_or(d.max_alive_failures),
            max_unknown_failures: s.max_unknown_failures.unwrap_or(d.max_unknown_failures),
            max_accept_failures: s.max_accept_failures.unwrap_or(d.max_accept_failures),
            min_reconnection_time: s
                .min_reconnection_time_secs
                .map_or(d.min_reconnection_time, Duration::from_secs),
            default_timeout: s
                .default_timeout_ms
                .map_or(d.default_timeout, Duration::from_millis),
            min_timeout: s.min_timeout_ms.map_or(d.min_timeout, Duration::from_millis),
            rtt_factor: s.rtt_factor.unwrap_or(d.rtt_factor),
        }
    }

    fn refresher_config(s: RefresherSection) -> RefresherConfig {
        let d = RefresherConfig::default();
        RefresherConfig {
            delay: s.delay_secs.map_or(d.delay, Duration::from_secs),
            uniform_jitter: s.uniform_jitter.unwrap_or(d.uniform_jitter),
            ping_nearest: match s.ping_nearest_secs {
                None => d.ping_nearest,
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
            },
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn routing_config(&self) -> RoutingConfig {
            self.config.clone()
        }
    }
}

#[cfg(feature = "toml-config")]
pub use toml_config::TomlConfigProvider;
