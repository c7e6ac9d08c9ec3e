//! Pluggable random source.
//!
//! Idle-timer jitter, ratio tie-breaks, counter-reply rolls, and weighted
//! task sampling all draw randomness through this trait so tests can script
//! the exact sequence of draws instead of fighting `thread_rng`.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Source of uniform random draws.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0.0, 1.0)`.
    fn next_f64(&self) -> f64;

    /// Uniform draw in `[low, high)`. `high` must be greater than `low`.
    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        debug_assert!(high > low);
        low + (self.next_f64() * (high - low) as f64) as u64
    }

    /// True with the given probability.
    fn roll(&self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

/// Default source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn next_in_range(&self, low: u64, high: u64) -> u64 {
        rand::thread_rng().gen_range(low..high)
    }
}

/// Deterministic source that replays a scripted sequence of draws.
///
/// When the script runs out it keeps returning 0.5, which makes exhausted
/// scripts visible in tests (a 0.5 draw fails most probability rolls).
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    draws: Mutex<VecDeque<f64>>,
}

impl ScriptedRandom {
    /// Create a source that replays the given draws in order.
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: Mutex::new(draws.into_iter().collect()),
        }
    }

    /// Number of unconsumed draws.
    pub fn remaining(&self) -> usize {
        self.draws.lock().expect("rng script lock").len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        self.draws
            .lock()
            .expect("rng script lock")
            .pop_front()
            .unwrap_or(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_in_unit_interval() {
        let rng = ThreadRandom;
        for _ in 0..100 {
            let draw = rng.next_f64();
            assert!((0.0..1.0).contains(&draw));
        }
    }

    #[test]
    fn test_thread_random_range() {
        let rng = ThreadRandom;
        for _ in 0..100 {
            let draw = rng.next_in_range(10, 20);
            assert!((10..20).contains(&draw));
        }
    }

    #[test]
    fn test_scripted_replays_in_order() {
        let rng = ScriptedRandom::new([0.1, 0.9, 0.3]);
        assert_eq!(rng.next_f64(), 0.1);
        assert_eq!(rng.next_f64(), 0.9);
        assert_eq!(rng.next_f64(), 0.3);
        // Exhausted script falls back to 0.5.
        assert_eq!(rng.next_f64(), 0.5);
    }

    #[test]
    fn test_scripted_range_mapping() {
        let rng = ScriptedRandom::new([0.0, 0.999]);
        assert_eq!(rng.next_in_range(5, 15), 5);
        assert_eq!(rng.next_in_range(5, 15), 14);
    }

    #[test]
    fn test_roll() {
        let rng = ScriptedRandom::new([0.2, 0.2]);
        assert!(rng.roll(0.25));
        assert!(!rng.roll(0.1));
    }
}
