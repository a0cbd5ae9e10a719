//! Hub configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Largest accepted per-connection outbound queue.
pub const MAX_OUTBOUND_QUEUE_CAPACITY: usize = 4096;

/// Longest accepted eviction grace period, in milliseconds.
pub const MAX_EVICTION_GRACE_MS: u64 = 60_000;

/// Connection hub tuning
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Frames buffered per connection before new frames are dropped
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Interval clients are expected to ping at. Only used for reporting;
    /// the hub never closes a quiet connection.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// How long an evicted connection keeps flushing its queue before the
    /// close frame is sent
    #[serde(default = "default_eviction_grace")]
    pub eviction_grace_ms: u64,
}

impl HubConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn eviction_grace(&self) -> Duration {
        Duration::from_millis(self.eviction_grace_ms)
    }

    /// Validate hub configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.outbound_queue_capacity == 0
            || self.outbound_queue_capacity > MAX_OUTBOUND_QUEUE_CAPACITY
        {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        if self.eviction_grace_ms > MAX_EVICTION_GRACE_MS {
            return Err(ValidationError::InvalidEvictionGrace);
        }
        Ok(())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            eviction_grace_ms: default_eviction_grace(),
        }
    }
}

fn default_outbound_queue_capacity() -> usize {
    64
}

fn default_heartbeat_interval() -> u64 {
    15
}

fn default_eviction_grace() -> u64 {
    1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_config_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.outbound_queue_capacity, 64);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(config.eviction_grace(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_queue_capacity_bounds() {
        let config = HubConfig {
            outbound_queue_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidQueueCapacity));

        let config = HubConfig {
            outbound_queue_capacity: MAX_OUTBOUND_QUEUE_CAPACITY + 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidQueueCapacity));

        let config = HubConfig {
            outbound_queue_capacity: MAX_OUTBOUND_QUEUE_CAPACITY,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_heartbeat() {
        let config = HubConfig {
            heartbeat_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidHeartbeatInterval)
        );
    }

    #[test]
    fn test_validation_eviction_grace_bounds() {
        let config = HubConfig {
            eviction_grace_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = HubConfig {
            eviction_grace_ms: MAX_EVICTION_GRACE_MS + 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidEvictionGrace));
    }
}
