//! Bounded in-memory conversation history.
//!
//! Keeps a short, per-key (user or group) window of recent turns for prompt
//! assembly. This is working memory only: it is capped, FIFO-evicted, and
//! lost on restart. Durable history lives in the external store behind the
//! `HistoryStore` trait in `tandem-agent`.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default cap on turns kept per key.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// A real user message.
    User,
    /// A message from either agent.
    Agent,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Role of the sender.
    pub role: TurnRole,
    /// Text content.
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn with the current timestamp.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an agent turn.
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, content)
    }
}

/// Per-key bounded conversation history with FIFO eviction.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    max_turns: usize,
    turns: HashMap<String, VecDeque<ConversationTurn>>,
}

impl ConversationHistory {
    /// Create a history with the default per-key cap.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_TURNS)
    }

    /// Create a history with a custom per-key cap.
    pub fn with_capacity(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            turns: HashMap::new(),
        }
    }

    /// Append a turn for a key, evicting the oldest turns past the cap.
    pub fn push(&mut self, key: &str, turn: ConversationTurn) {
        let entry = self.turns.entry(key.to_string()).or_default();
        entry.push_back(turn);
        while entry.len() > self.max_turns {
            entry.pop_front();
        }
    }

    /// All retained turns for a key, oldest first.
    pub fn get(&self, key: &str) -> Vec<ConversationTurn> {
        self.turns
            .get(key)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The most recent `n` turns for a key, oldest first.
    pub fn recent(&self, key: &str, n: usize) -> Vec<ConversationTurn> {
        self.turns
            .get(key)
            .map(|turns| {
                turns
                    .iter()
                    .skip(turns.len().saturating_sub(n))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of retained turns for a key.
    pub fn len(&self, key: &str) -> usize {
        self.turns.get(key).map_or(0, |turns| turns.len())
    }

    /// True when no turns are retained for a key.
    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    /// Drop all turns for a key.
    pub fn clear(&mut self, key: &str) {
        self.turns.remove(key);
    }

    /// Keys that currently have retained turns.
    pub fn keys(&self) -> Vec<String> {
        self.turns.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_never_exceeds_cap() {
        let mut history = ConversationHistory::with_capacity(5);
        for i in 0..50 {
            history.push("group-1", ConversationTurn::user(format!("msg {i}")));
            assert!(history.len("group-1") <= 5);
        }
        assert_eq!(history.len("group-1"), 5);
    }

    #[test]
    fn test_oldest_turns_evicted_first() {
        let mut history = ConversationHistory::with_capacity(3);
        for i in 0..5 {
            history.push("u", ConversationTurn::agent(format!("msg {i}")));
        }
        let contents: Vec<String> = history
            .get("u")
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(contents, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut history = ConversationHistory::with_capacity(2);
        history.push("a", ConversationTurn::user("one"));
        history.push("b", ConversationTurn::user("two"));
        history.push("a", ConversationTurn::agent("three"));
        assert_eq!(history.len("a"), 2);
        assert_eq!(history.len("b"), 1);

        history.clear("a");
        assert!(history.is_empty("a"));
        assert_eq!(history.len("b"), 1);
    }

    #[test]
    fn test_recent_returns_tail() {
        let mut history = ConversationHistory::new();
        for i in 0..10 {
            history.push("g", ConversationTurn::user(format!("msg {i}")));
        }
        let recent = history.recent("g", 3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "msg 7");
        assert_eq!(recent[2].content, "msg 9");
    }
}
