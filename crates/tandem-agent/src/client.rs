//! OpenRouter API client for chat completions.
//!
//! All generation goes through the [`TextGenerator`] trait so the
//! coordinator and tests can substitute their own backends. The default
//! implementation talks to OpenRouter's chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use tandem_core::{ConversationTurn, TurnRole};

use crate::error::{AgentError, Result};

/// Environment variable for the OpenRouter API key.
pub const OPENROUTER_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenRouter chat completions endpoint.
const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Generation tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.8
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier (e.g., "anthropic/claude-3.5-haiku").
    pub model: String,
    /// System prompt (persona).
    pub system_prompt: String,
    /// Recent conversation turns, oldest first.
    pub history: Vec<ConversationTurn>,
    /// The user prompt for this turn.
    pub user_prompt: String,
    /// Tuning parameters.
    pub params: GenerationParams,
}

/// A completed generation with token accounting.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Generated text.
    pub text: String,
    /// Prompt tokens consumed.
    pub tokens_in: u32,
    /// Completion tokens produced.
    pub tokens_out: u32,
}

/// Opaque text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a request.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// OpenRouter-backed [`TextGenerator`].
#[derive(Clone)]
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
}

impl OpenRouterClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from the `OPENROUTER_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(OPENROUTER_API_KEY_ENV).map_err(|_| {
            AgentError::Configuration(format!(
                "Missing {} environment variable",
                OPENROUTER_API_KEY_ENV
            ))
        })?;
        Ok(Self::new(api_key))
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation> {
        let chat_request = ChatRequest::from_generation(request);
        trace!("Sending chat request: {:?}", chat_request);

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| AgentError::Generation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Generation(format!(
                "OpenRouter API error {}: {}",
                status, text
            )));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ResponseParse(format!("Failed to parse response: {}", e)))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| AgentError::ResponseParse("empty choices in response".to_string()))?;

        let (tokens_in, tokens_out) = response
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        debug!(
            model = %request.model,
            tokens_in,
            tokens_out,
            "Chat response received"
        );

        Ok(Generation {
            text,
            tokens_in,
            tokens_out,
        })
    }
}

/// Chat completion request body.
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatRequest {
    fn from_generation(request: &GenerationRequest) -> Self {
        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::system(&request.system_prompt));
        for turn in &request.history {
            messages.push(match turn.role {
                TurnRole::User => ChatMessage::user(&turn.content),
                TurnRole::Agent => ChatMessage::assistant(&turn.content),
            });
        }
        messages.push(ChatMessage::user(&request.user_prompt));

        Self {
            model: request.model.clone(),
            messages,
            max_tokens: Some(request.params.max_tokens),
            temperature: Some(request.params.temperature),
        }
    }
}

/// A message in the chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.to_string()),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.to_string()),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.to_string()),
        }
    }
}

/// Chat completion response body.
#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_assembly_orders_messages() {
        let request = GenerationRequest {
            model: "anthropic/claude-3.5-haiku".to_string(),
            system_prompt: "You are Tandem.".to_string(),
            history: vec![
                ConversationTurn::user("hi"),
                ConversationTurn::agent("hello!"),
            ],
            user_prompt: "how are you?".to_string(),
            params: GenerationParams::default(),
        };

        let chat = ChatRequest::from_generation(&request);
        assert_eq!(chat.messages.len(), 4);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].role, "user");
        assert_eq!(chat.messages[2].role, "assistant");
        assert_eq!(chat.messages[3].role, "user");
        assert_eq!(chat.messages[3].content.as_deref(), Some("how are you?"));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hi there"}}],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("hi there")
        );
        assert_eq!(response.usage.unwrap().prompt_tokens, 42);
    }

    #[test]
    fn test_from_env_missing_key() {
        std::env::remove_var(OPENROUTER_API_KEY_ENV);
        assert!(matches!(
            OpenRouterClient::from_env(),
            Err(AgentError::Configuration(_))
        ));
    }
}
