//! Router configuration.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the model router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Target share of traffic for the secondary provider (0.0 to 1.0).
    #[serde(default = "default_secondary_ratio")]
    pub secondary_ratio: f64,

    /// Usage counter ceiling; counters are halved when the total reaches it.
    #[serde(default = "default_usage_ceiling")]
    pub usage_ceiling: u64,

    /// Complexity at or above which the high-capability model is chosen.
    #[serde(default = "default_deep_threshold")]
    pub deep_complexity_threshold: f32,
}

fn default_secondary_ratio() -> f64 {
    0.25
}

fn default_usage_ceiling() -> u64 {
    100
}

fn default_deep_threshold() -> f32 {
    3.0
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            secondary_ratio: default_secondary_ratio(),
            usage_ceiling: default_usage_ceiling(),
            deep_complexity_threshold: default_deep_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::default();
        assert_eq!(config.secondary_ratio, 0.25);
        assert_eq!(config.usage_ceiling, 100);
        assert_eq!(config.deep_complexity_threshold, 3.0);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: RouterConfig = serde_json::from_str(r#"{"secondary_ratio": 0.4}"#).unwrap();
        assert_eq!(config.secondary_ratio, 0.4);
        assert_eq!(config.usage_ceiling, 100);
    }
}
