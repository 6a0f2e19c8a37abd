//! Discovery configuration.
//!
//! This module defines the tunables of the discovery core. Durations are
//! serialized as whole milliseconds so the struct can be embedded in a
//! TOML file as-is.

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::filter::TransportProfile;
use crate::traits::DhtScope;
use peerkeep_types::constants::{
    DEFAULT_BLOCK_DURATION_MS, DEFAULT_CLOSEST_PEERS_COUNT, DEFAULT_DISCOVERY_INTERVAL_MS,
    DEFAULT_MAX_CONNECTION_ATTEMPTS, DEFAULT_NOTIFICATION_CAPACITY, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_WARMUP_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the discovery core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Dial attempts allowed before a peer stops being scheduled.
    ///
    /// Default: 3.
    pub max_attempts: u32,

    /// How long a peer stays blocked after every address failed.
    ///
    /// Default: 60 seconds.
    #[serde(with = "duration_ms", rename = "block_duration_ms")]
    pub block_duration: Duration,

    /// Pause between consecutive dials of a retry sweep.
    ///
    /// Default: 5 seconds.
    #[serde(with = "duration_ms", rename = "retry_delay_ms")]
    pub retry_delay: Duration,

    /// Period of the active discovery loop.
    ///
    /// Default: 30 seconds.
    #[serde(with = "duration_ms", rename = "discovery_interval_ms")]
    pub discovery_interval: Duration,

    /// Delay before the first active discovery cycle.
    ///
    /// Default: 2 seconds.
    #[serde(with = "duration_ms", rename = "warmup_delay_ms")]
    pub warmup_delay: Duration,

    /// Number of closest peers requested per cycle.
    ///
    /// Default: 20.
    pub closest_peers_count: usize,

    /// DHT instances queried by active discovery, in order.
    ///
    /// Default: all three.
    pub dht_scopes: Vec<DhtScope>,

    /// Transports the environment can dial.
    ///
    /// Default: native.
    pub transport_profile: TransportProfile,

    /// Whether a passive discovery event immediately schedules a dial.
    ///
    /// Default: true.
    pub dial_on_discovery: bool,

    /// Buffered summaries per subscriber before the slowest one lags.
    ///
    /// Default: 64.
    pub notification_capacity: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_CONNECTION_ATTEMPTS,
            block_duration: Duration::from_millis(DEFAULT_BLOCK_DURATION_MS),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            discovery_interval: Duration::from_millis(DEFAULT_DISCOVERY_INTERVAL_MS),
            warmup_delay: Duration::from_millis(DEFAULT_WARMUP_DELAY_MS),
            closest_peers_count: DEFAULT_CLOSEST_PEERS_COUNT,
            dht_scopes: DhtScope::ALL.to_vec(),
            transport_profile: TransportProfile::default(),
            dial_on_discovery: true,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the block duration after exhausted addresses.
    pub fn with_block_duration(mut self, duration: Duration) -> Self {
        self.block_duration = duration;
        self
    }

    /// Set the delay between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the discovery interval.
    pub fn with_discovery_interval(mut self, interval: Duration) -> Self {
        self.discovery_interval = interval;
        self
    }

    /// Set the warm-up delay.
    pub fn with_warmup_delay(mut self, delay: Duration) -> Self {
        self.warmup_delay = delay;
        self
    }

    /// Set the closest-peers count.
    pub fn with_closest_peers_count(mut self, count: usize) -> Self {
        self.closest_peers_count = count;
        self
    }

    /// Set the DHT instances to query.
    pub fn with_dht_scopes(mut self, scopes: Vec<DhtScope>) -> Self {
        self.dht_scopes = scopes;
        self
    }

    /// Set the transport profile.
    pub fn with_transport_profile(mut self, profile: TransportProfile) -> Self {
        self.transport_profile = profile;
        self
    }

    /// Enable or disable dialing on passive discovery.
    pub fn with_dial_on_discovery(mut self, enable: bool) -> Self {
        self.dial_on_discovery = enable;
        self
    }

    /// Set the notification channel capacity.
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Check the configuration for values the core cannot run with.
    pub fn validate(&self) -> DiscoveryResult<()> {
        if self.max_attempts == 0 {
            return Err(DiscoveryError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.discovery_interval.is_zero() {
            return Err(DiscoveryError::Config(
                "discovery_interval must be non-zero".into(),
            ));
        }
        if self.closest_peers_count == 0 {
            return Err(DiscoveryError::Config(
                "closest_peers_count must be at least 1".into(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(DiscoveryError::Config(
                "notification_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.block_duration, Duration::from_secs(60));
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.discovery_interval, Duration::from_secs(30));
        assert_eq!(config.warmup_delay, Duration::from_secs(2));
        assert_eq!(config.closest_peers_count, 20);
        assert_eq!(
            config.dht_scopes,
            vec![DhtScope::Lan, DhtScope::Wan, DhtScope::Auxiliary]
        );
        assert_eq!(config.transport_profile, TransportProfile::Native);
        assert!(config.dial_on_discovery);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DiscoveryConfig::new()
            .with_max_attempts(5)
            .with_retry_delay(Duration::from_millis(250))
            .with_dht_scopes(vec![DhtScope::Wan])
            .with_transport_profile(TransportProfile::Browser)
            .with_dial_on_discovery(false);

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay.as_millis(), 250);
        assert_eq!(config.dht_scopes, vec![DhtScope::Wan]);
        assert_eq!(config.transport_profile, TransportProfile::Browser);
        assert!(!config.dial_on_discovery);
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert!(DiscoveryConfig::new().with_max_attempts(0).validate().is_err());
        assert!(DiscoveryConfig::new()
            .with_discovery_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(DiscoveryConfig::new()
            .with_closest_peers_count(0)
            .validate()
            .is_err());

        let err = DiscoveryConfig::new()
            .with_notification_capacity(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Config(_)));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            max_attempts = 5
            retry_delay_ms = 1500
            dht_scopes = ["wan"]
            transport_profile = "browser"
        "#;

        let config: DiscoveryConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(1500));
        assert_eq!(config.dht_scopes, vec![DhtScope::Wan]);
        assert_eq!(config.transport_profile, TransportProfile::Browser);
        assert_eq!(config.block_duration, Duration::from_secs(60));
        assert_eq!(config.closest_peers_count, 20);
    }

    #[test]
    fn test_custom_profile_toml() {
        let toml_str = r#"
            [transport_profile]
            custom = ["tcp", "quic-v1"]
        "#;

        let config: DiscoveryConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(
            config.transport_profile,
            TransportProfile::Custom(vec!["tcp".into(), "quic-v1".into()])
        );
    }

    #[test]
    fn test_json_roundtrip_uses_millis() {
        let config = DiscoveryConfig::default();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["block_duration_ms"], 60_000);
        assert_eq!(json["warmup_delay_ms"], 2_000);

        let back: DiscoveryConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
