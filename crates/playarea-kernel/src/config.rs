//! Configuration types for the play area.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Side length of the square grid.
pub const GRID_SIZE: usize = 100;
/// Capacity of the fair FIFO request queue.
pub const QUEUE_CAPACITY: usize = 100;
/// Delay between a verdict and the player's next proposal.
pub const MOVE_DELAY_MS: u64 = 1_000;
/// Delay between an eviction and the player's request to return.
pub const REINSTATEMENT_DELAY_MS: u64 = 10_000;
/// Fouls without an intervening reinstatement that trigger an eviction.
pub const EVICTION_FLAG_THRESHOLD: u32 = 2;
/// Evictions after which a player is never reinstated.
pub const PERMANENT_EVICTION_THRESHOLD: u32 = 2;
/// Cap on rejection-sampling draws when placing a player.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100_000;
/// Cap on rejection-sampling draws when choosing a direction.
pub const MAX_DIRECTION_ATTEMPTS: u32 = 64;

/// Top-level simulation configuration.
///
/// Every field falls back to the constant of the same name, so a JSON file
/// only needs to list the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub grid_size: usize,
    pub queue_capacity: usize,
    pub move_delay_ms: u64,
    pub reinstatement_delay_ms: u64,
    pub eviction: EvictionPolicy,
    pub max_placement_attempts: u32,
    pub max_direction_attempts: u32,
    /// Seed for every random draw in a run (None picks one at random)
    pub seed: Option<u64>,
}

/// Thresholds governing flag → evict → reinstate transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionPolicy {
    /// Fouls since the last reinstatement that evict the player
    pub flag_threshold: u32,
    /// Evictions that make removal permanent
    pub permanent_threshold: u32,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            flag_threshold: EVICTION_FLAG_THRESHOLD,
            permanent_threshold: PERMANENT_EVICTION_THRESHOLD,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: GRID_SIZE,
            queue_capacity: QUEUE_CAPACITY,
            move_delay_ms: MOVE_DELAY_MS,
            reinstatement_delay_ms: REINSTATEMENT_DELAY_MS,
            eviction: EvictionPolicy::default(),
            max_placement_attempts: MAX_PLACEMENT_ATTEMPTS,
            max_direction_attempts: MAX_DIRECTION_ATTEMPTS,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size < 2 {
            return Err(KernelError::InvalidConfig("grid_size must be at least 2"));
        }
        if self.queue_capacity == 0 {
            return Err(KernelError::InvalidConfig("queue_capacity must be positive"));
        }
        if self.eviction.flag_threshold == 0 || self.eviction.permanent_threshold == 0 {
            return Err(KernelError::InvalidConfig("eviction thresholds must be positive"));
        }
        if self.max_placement_attempts == 0 || self.max_direction_attempts == 0 {
            return Err(KernelError::InvalidConfig("retry caps must be positive"));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }

    pub fn reinstatement_delay(&self) -> Duration {
        Duration::from_millis(self.reinstatement_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.grid_size, 100);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.move_delay(), Duration::from_secs(1));
        assert_eq!(config.reinstatement_delay(), Duration::from_secs(10));
        assert_eq!(config.eviction.flag_threshold, 2);
        assert_eq!(config.eviction.permanent_threshold, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"grid_size": 8, "eviction": {"flag_threshold": 3}}"#).unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.eviction.flag_threshold, 3);
        assert_eq!(config.eviction.permanent_threshold, PERMANENT_EVICTION_THRESHOLD);
        assert_eq!(config.queue_capacity, QUEUE_CAPACITY);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_validate_rejects_degenerate_values() {
        let tiny = SimulationConfig {
            grid_size: 1,
            ..Default::default()
        };
        assert!(matches!(tiny.validate(), Err(KernelError::InvalidConfig(_))));

        let no_queue = SimulationConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(no_queue.validate().is_err());

        let no_threshold = SimulationConfig {
            eviction: EvictionPolicy {
                flag_threshold: 0,
                permanent_threshold: 2,
            },
            ..Default::default()
        };
        assert!(no_threshold.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("playarea-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"grid_size": 6, "seed": 9}"#).unwrap();

        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.grid_size, 6);
        assert_eq!(config.seed, Some(9));

        std::fs::write(&path, r#"{"grid_size": 0}"#).unwrap();
        assert!(SimulationConfig::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
