//! Agent persona definitions.
//!
//! Tandem runs two logical agents per group: the primary companion, who
//! answers real user messages, and the shadow companion, who occasionally
//! interjects after the primary speaks. Both are plain data here; behavior
//! lives in [`crate::agent`] and the coordinator.

use serde::{Deserialize, Serialize};

/// A companion persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPersona {
    /// Stable identifier ("primary", "shadow").
    pub id: String,

    /// Display name used in prompts and logs.
    pub name: String,

    /// System prompt establishing tone and role.
    pub system_prompt: String,

    /// Probability that this persona speaks when offered an interjection.
    pub interjection_chance: f64,

    /// Probability of a one-hop counter-reply after the other agent
    /// interjects. Only meaningful for the primary persona.
    pub counter_reply_chance: f64,
}

impl AgentPersona {
    /// The primary companion: warm, direct, answers every real message.
    pub fn primary() -> Self {
        Self {
            id: "primary".to_string(),
            name: "Mori".to_string(),
            system_prompt: "You are Mori, a warm and attentive companion in a group chat. \
                            Answer the user directly and keep replies conversational. \
                            When another companion chimes in, you may briefly respond to \
                            them, but always keep the user at the center."
                .to_string(),
            interjection_chance: 1.0,
            counter_reply_chance: 0.25,
        }
    }

    /// The shadow companion: playful, interjects selectively.
    pub fn shadow() -> Self {
        Self {
            id: "shadow".to_string(),
            name: "Kiva".to_string(),
            system_prompt: "You are Kiva, a playful second companion in a group chat. \
                            You see what Mori just said and may add a short aside, a \
                            tease, or a different angle. Stay brief; one or two \
                            sentences. If you have nothing worth adding, say nothing."
                .to_string(),
            interjection_chance: 0.6,
            counter_reply_chance: 0.0,
        }
    }

    /// True for the primary persona.
    pub fn is_primary(&self) -> bool {
        self.id == "primary"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personas_distinct() {
        let primary = AgentPersona::primary();
        let shadow = AgentPersona::shadow();
        assert!(primary.is_primary());
        assert!(!shadow.is_primary());
        assert_ne!(primary.system_prompt, shadow.system_prompt);
    }

    #[test]
    fn test_counter_reply_only_primary() {
        assert!(AgentPersona::primary().counter_reply_chance > 0.0);
        assert_eq!(AgentPersona::shadow().counter_reply_chance, 0.0);
    }
}
