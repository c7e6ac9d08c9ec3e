//! Rolling per-provider usage counters.
//!
//! The counters feed the ratio-balancing rule. When the total reaches the
//! ceiling every counter is halved rather than reset, so the recent
//! primary/secondary ratio survives while magnitudes stay bounded.

use serde::{Deserialize, Serialize};

use crate::router::Provider;

/// Read-only snapshot of the usage counters, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Decisions routed to the primary provider since the last halvings.
    pub primary: u64,
    /// Decisions routed to the secondary provider.
    pub secondary: u64,
    /// Total decisions.
    pub total: u64,
}

/// Rolling usage counter with ceiling-triggered halving.
#[derive(Debug, Clone)]
pub struct UsageCounter {
    primary: u64,
    secondary: u64,
    total: u64,
    ceiling: u64,
}

impl UsageCounter {
    /// Create a counter that halves when `total` reaches `ceiling`.
    pub fn new(ceiling: u64) -> Self {
        Self {
            primary: 0,
            secondary: 0,
            total: 0,
            ceiling: ceiling.max(2),
        }
    }

    /// Record a finalized routing decision for a provider.
    pub fn record(&mut self, provider: Provider) {
        match provider {
            Provider::Anthropic => self.primary += 1,
            Provider::OpenAI => self.secondary += 1,
        }
        self.total += 1;
        if self.total >= self.ceiling {
            self.primary /= 2;
            self.secondary /= 2;
            self.total = self.primary + self.secondary;
        }
    }

    /// Observed traffic share for a provider (0.0 when nothing recorded).
    pub fn ratio(&self, provider: Provider) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = match provider {
            Provider::Anthropic => self.primary,
            Provider::OpenAI => self.secondary,
        };
        count as f64 / self.total as f64
    }

    /// Snapshot the counters.
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            primary: self.primary,
            secondary: self.secondary,
            total: self.total,
        }
    }
}

impl Default for UsageCounter {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_ratio() {
        let mut counter = UsageCounter::new(100);
        for _ in 0..3 {
            counter.record(Provider::Anthropic);
        }
        counter.record(Provider::OpenAI);
        assert_eq!(counter.snapshot().total, 4);
        assert_eq!(counter.ratio(Provider::OpenAI), 0.25);
        assert_eq!(counter.ratio(Provider::Anthropic), 0.75);
    }

    #[test]
    fn test_halving_preserves_ratio() {
        let mut counter = UsageCounter::new(100);
        for _ in 0..74 {
            counter.record(Provider::Anthropic);
        }
        for _ in 0..25 {
            counter.record(Provider::OpenAI);
        }
        // 100th decision crosses the ceiling and triggers halving.
        counter.record(Provider::Anthropic);
        let snapshot = counter.snapshot();
        assert_eq!(snapshot.primary, 37);
        assert_eq!(snapshot.secondary, 12);
        assert_eq!(snapshot.total, 49);
        // Ratio stays close to the pre-halving 75/25.
        assert!((counter.ratio(Provider::OpenAI) - 0.25).abs() < 0.05);
    }

    #[test]
    fn test_empty_counter_ratio_is_zero() {
        let counter = UsageCounter::default();
        assert_eq!(counter.ratio(Provider::OpenAI), 0.0);
        assert_eq!(counter.ratio(Provider::Anthropic), 0.0);
    }

    #[test]
    fn test_counters_stay_bounded() {
        let mut counter = UsageCounter::new(100);
        for i in 0..10_000 {
            let provider = if i % 4 == 0 {
                Provider::OpenAI
            } else {
                Provider::Anthropic
            };
            counter.record(provider);
            assert!(counter.snapshot().total < 100);
        }
    }
}
