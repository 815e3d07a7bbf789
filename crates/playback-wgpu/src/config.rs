//! Player configuration

use crate::{error::ConfigError, pool::DEFAULT_SLOT_COUNT};
use std::time::Duration;

/// Fewest slots that still let one frame stay on display while another is decoded
pub const MIN_SLOT_COUNT: usize = 2;

/// Default period of the decode tick, roughly one 60 Hz refresh
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Settings fixed for the lifetime of a playback session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Number of frame slots in the pool
    pub slot_count: usize,
    /// Period of the decode tick
    pub tick_interval: Duration,
    /// Start with the presentation clock frozen
    pub start_paused: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            start_paused: false,
        }
    }
}

impl PlayerConfig {
    /// # Errors
    /// Rejects fewer than [`MIN_SLOT_COUNT`] slots and a zero tick interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count < MIN_SLOT_COUNT {
            return Err(ConfigError::TooFewSlots {
                requested: self.slot_count,
                minimum: MIN_SLOT_COUNT,
            });
        }

        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlayerConfig::default();

        assert_eq!(config.slot_count, 5);
        assert_eq!(config.tick_interval, Duration::from_millis(16));
        assert!(!config.start_paused);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let config = PlayerConfig {
            slot_count: 1,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TooFewSlots { requested: 1, minimum: 2 }));

        let config = PlayerConfig {
            tick_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickInterval));
    }
}
