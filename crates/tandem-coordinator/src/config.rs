//! Coordinator configuration.
//!
//! All delays are in milliseconds so tests can shrink them to the
//! millisecond scale; production values default to the minute scale.

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

/// Tuning knobs for the dual-agent coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Lower bound of the randomized idle window (default 25 minutes).
    #[serde(default = "default_idle_min")]
    pub idle_window_min_ms: u64,

    /// Upper bound of the randomized idle window (default 55 minutes).
    #[serde(default = "default_idle_max")]
    pub idle_window_max_ms: u64,

    /// Minimum spacing between two bursts in the same group (default 2 hours).
    #[serde(default = "default_burst_cooldown")]
    pub burst_cooldown_ms: u64,

    /// Minimum turns per idle burst.
    #[serde(default = "default_burst_turns_min")]
    pub burst_turns_min: u64,

    /// Maximum turns per idle burst.
    #[serde(default = "default_burst_turns_max")]
    pub burst_turns_max: u64,

    /// Delay between consecutive burst turns (default 20 seconds).
    #[serde(default = "default_inter_turn_delay")]
    pub inter_turn_delay_ms: u64,

    /// The shadow agent may react to every k-th burst turn.
    #[serde(default = "default_shadow_reaction_every")]
    pub shadow_reaction_every: u64,

    /// Delay before a shadow interjection after a primary reply (default 6 s).
    #[serde(default = "default_shadow_delay")]
    pub shadow_delay_ms: u64,

    /// Groups inactive past this horizon are swept (default 30 days).
    #[serde(default = "default_stale_horizon")]
    pub stale_group_horizon_ms: u64,
}

fn default_idle_min() -> u64 {
    25 * 60 * 1000
}

fn default_idle_max() -> u64 {
    55 * 60 * 1000
}

fn default_burst_cooldown() -> u64 {
    2 * 60 * 60 * 1000
}

fn default_burst_turns_min() -> u64 {
    4
}

fn default_burst_turns_max() -> u64 {
    10
}

fn default_inter_turn_delay() -> u64 {
    20 * 1000
}

fn default_shadow_reaction_every() -> u64 {
    3
}

fn default_shadow_delay() -> u64 {
    6 * 1000
}

fn default_stale_horizon() -> u64 {
    30 * 24 * 60 * 60 * 1000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            idle_window_min_ms: default_idle_min(),
            idle_window_max_ms: default_idle_max(),
            burst_cooldown_ms: default_burst_cooldown(),
            burst_turns_min: default_burst_turns_min(),
            burst_turns_max: default_burst_turns_max(),
            inter_turn_delay_ms: default_inter_turn_delay(),
            shadow_reaction_every: default_shadow_reaction_every(),
            shadow_delay_ms: default_shadow_delay(),
            stale_group_horizon_ms: default_stale_horizon(),
        }
    }
}

impl CoordinatorConfig {
    /// Validate window and turn ranges.
    pub fn validate(&self) -> Result<()> {
        if self.idle_window_min_ms > self.idle_window_max_ms {
            return Err(CoordinatorError::Configuration(
                "idle window min exceeds max".to_string(),
            ));
        }
        if self.burst_turns_min > self.burst_turns_max || self.burst_turns_min == 0 {
            return Err(CoordinatorError::Configuration(
                "invalid burst turn range".to_string(),
            ));
        }
        if self.shadow_reaction_every == 0 {
            return Err(CoordinatorError::Configuration(
                "shadow_reaction_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.idle_window_min_ms, 25 * 60 * 1000);
        assert_eq!(config.burst_turns_max, 10);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let config = CoordinatorConfig {
            idle_window_min_ms: 10,
            idle_window_max_ms: 5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_burst_turns_rejected() {
        let config = CoordinatorConfig {
            burst_turns_min: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
