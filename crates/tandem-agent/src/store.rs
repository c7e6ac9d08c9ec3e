//! Durable history store seam.
//!
//! The bounded in-memory history in `tandem-core` is working memory only;
//! durable conversation logs live behind this trait in whatever document
//! store the host wires up. The store also acts as the activity oracle for
//! idleness checks that need to survive restarts.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use tandem_core::ConversationTurn;

use crate::error::Result;

/// External durable conversation store.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a turn under a key with free-form metadata.
    async fn append(
        &self,
        key: &str,
        turn: &ConversationTurn,
        metadata: serde_json::Value,
    ) -> Result<()>;

    /// The most recent `limit` turns for a key, oldest first.
    async fn query(&self, key: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Whether a key has seen no activity within the threshold.
    async fn is_idle(&self, key: &str, threshold_minutes: i64) -> Result<bool>;
}

/// In-memory [`HistoryStore`] for tests and storeless deployments.
///
/// Unbounded by design; durable-store retention is the host's problem, and
/// this stand-in inherits that contract.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    entries: RwLock<HashMap<String, Vec<ConversationTurn>>>,
    last_activity: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryHistory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(
        &self,
        key: &str,
        turn: &ConversationTurn,
        _metadata: serde_json::Value,
    ) -> Result<()> {
        self.entries
            .write()
            .await
            .entry(key.to_string())
            .or_default()
            .push(turn.clone());
        self.last_activity
            .write()
            .await
            .insert(key.to_string(), turn.timestamp);
        Ok(())
    }

    async fn query(&self, key: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let entries = self.entries.read().await;
        let turns = entries.get(key).cloned().unwrap_or_default();
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    async fn is_idle(&self, key: &str, threshold_minutes: i64) -> Result<bool> {
        let last_activity = self.last_activity.read().await;
        Ok(match last_activity.get(key) {
            Some(at) => Utc::now() - *at > Duration::minutes(threshold_minutes),
            None => true,
        })
    }
}
