//! Per-group activity bookkeeping.
//!
//! One [`GroupActivity`] record exists per group the coordinator has seen.
//! The record carries the idle-timer handle; installing a new timer aborts
//! the previous one under the same write lock, which is what guarantees at
//! most one pending idle-timer callback per group at any instant. The burst
//! epoch is bumped on every real user message so an in-flight burst can
//! detect that it has been overtaken.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Mutable state for one group.
#[derive(Debug)]
struct GroupActivity {
    last_activity: DateTime<Utc>,
    idle_timer: Option<JoinHandle<()>>,
    last_burst: Option<DateTime<Utc>>,
    burst_epoch: u64,
}

impl GroupActivity {
    fn new() -> Self {
        Self {
            last_activity: Utc::now(),
            idle_timer: None,
            last_burst: None,
            burst_epoch: 0,
        }
    }
}

/// Registry of per-group activity records.
#[derive(Debug, Default)]
pub struct ActivityRegistry {
    groups: RwLock<HashMap<i64, GroupActivity>>,
}

impl ActivityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record activity for a group (user or agent message).
    pub async fn note_activity(&self, group_id: i64) {
        let mut groups = self.groups.write().await;
        groups
            .entry(group_id)
            .or_insert_with(GroupActivity::new)
            .last_activity = Utc::now();
    }

    /// Install a new idle timer, aborting the previous one. The swap happens
    /// under the write lock so no second pending timer can ever coexist.
    pub async fn install_timer(&self, group_id: i64, handle: JoinHandle<()>) {
        let mut groups = self.groups.write().await;
        let group = groups.entry(group_id).or_insert_with(GroupActivity::new);
        if let Some(previous) = group.idle_timer.replace(handle) {
            previous.abort();
        }
    }

    /// Bump the burst epoch for a group (real user message arrived).
    /// Any in-flight burst observing an older epoch stops.
    pub async fn bump_epoch(&self, group_id: i64) -> u64 {
        let mut groups = self.groups.write().await;
        let group = groups.entry(group_id).or_insert_with(GroupActivity::new);
        group.burst_epoch += 1;
        group.burst_epoch
    }

    /// Current burst epoch for a group.
    pub async fn epoch(&self, group_id: i64) -> u64 {
        self.groups
            .read()
            .await
            .get(&group_id)
            .map_or(0, |g| g.burst_epoch)
    }

    /// Atomically check idleness and cooldown, claiming the burst slot on
    /// success. A fired timer proves nothing by itself: activity may have
    /// raced it, so elapsed time is recomputed here under the lock.
    pub async fn try_begin_burst(
        &self,
        group_id: i64,
        min_idle: Duration,
        cooldown: Duration,
    ) -> bool {
        let mut groups = self.groups.write().await;
        let Some(group) = groups.get_mut(&group_id) else {
            return false;
        };
        let now = Utc::now();
        if now - group.last_activity < min_idle {
            debug!(group_id, "Idle timer fired but group is no longer idle");
            return false;
        }
        if let Some(last_burst) = group.last_burst {
            if now - last_burst < cooldown {
                debug!(group_id, "Burst suppressed by cooldown");
                return false;
            }
        }
        group.last_burst = Some(now);
        true
    }

    /// Groups currently tracked.
    pub async fn active_groups(&self) -> Vec<i64> {
        self.groups.read().await.keys().copied().collect()
    }

    /// Whether a group is currently tracked.
    pub async fn contains(&self, group_id: i64) -> bool {
        self.groups.read().await.contains_key(&group_id)
    }

    /// Evict groups inactive past the horizon, aborting their timers.
    /// Returns the evicted group ids.
    pub async fn sweep_stale(&self, horizon: Duration) -> Vec<i64> {
        let now = Utc::now();
        let mut groups = self.groups.write().await;
        let stale: Vec<i64> = groups
            .iter()
            .filter(|(_, g)| now - g.last_activity > horizon)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            if let Some(group) = groups.remove(id) {
                if let Some(timer) = group.idle_timer {
                    timer.abort();
                }
            }
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "Swept stale groups");
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn test_timer_replacement_keeps_single_pending_callback() {
        let registry = ActivityRegistry::new();
        let fired = Arc::new(AtomicU32::new(0));

        // Install ten timers in rapid succession; each replaces the last.
        for _ in 0..10 {
            let fired = Arc::clone(&fired);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
                fired.fetch_add(1, Ordering::SeqCst);
            });
            registry.install_timer(7, handle).await;
        }

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_requires_real_idleness() {
        let registry = ActivityRegistry::new();
        registry.note_activity(1).await;
        // Activity was just recorded: a fired timer must not burst.
        assert!(
            !registry
                .try_begin_burst(1, Duration::minutes(10), Duration::minutes(60))
                .await
        );
        // With a zero idle requirement the burst goes through.
        assert!(
            registry
                .try_begin_burst(1, Duration::zero(), Duration::minutes(60))
                .await
        );
    }

    #[tokio::test]
    async fn test_burst_cooldown_enforced() {
        let registry = ActivityRegistry::new();
        registry.note_activity(1).await;
        assert!(
            registry
                .try_begin_burst(1, Duration::zero(), Duration::minutes(60))
                .await
        );
        // Second burst inside the cooldown is suppressed.
        assert!(
            !registry
                .try_begin_burst(1, Duration::zero(), Duration::minutes(60))
                .await
        );
    }

    #[tokio::test]
    async fn test_epoch_bumps_on_user_message() {
        let registry = ActivityRegistry::new();
        assert_eq!(registry.epoch(1).await, 0);
        assert_eq!(registry.bump_epoch(1).await, 1);
        assert_eq!(registry.bump_epoch(1).await, 2);
        assert_eq!(registry.epoch(1).await, 2);
        // Other groups are unaffected.
        assert_eq!(registry.epoch(2).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_group_never_bursts() {
        let registry = ActivityRegistry::new();
        assert!(
            !registry
                .try_begin_burst(99, Duration::zero(), Duration::zero())
                .await
        );
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_stale_groups() {
        let registry = ActivityRegistry::new();
        registry.note_activity(1).await;
        registry.note_activity(2).await;

        // Nothing is stale against a 1-hour horizon.
        assert!(registry.sweep_stale(Duration::hours(1)).await.is_empty());
        assert_eq!(registry.active_groups().await.len(), 2);

        // Everything is stale against a negative horizon.
        let mut swept = registry.sweep_stale(Duration::milliseconds(-1)).await;
        swept.sort_unstable();
        assert_eq!(swept, vec![1, 2]);
        assert!(registry.active_groups().await.is_empty());
        assert!(!registry.contains(1).await);
    }
}
