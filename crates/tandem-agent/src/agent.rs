//! The companion agent.
//!
//! `CompanionAgent` ties one persona to the classifier, the router, and a
//! text generator. Generation failures are recovered locally: the agent
//! walks the fallback chain for the routed model and, when the whole chain
//! fails, answers with a short canned reply instead of erroring. Callers
//! never see a hard failure from `reply` or `compose`.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use tandem_core::{Classifier, ConversationHistory, ConversationTurn};
use tandem_router::{fallback_chain, is_excluded, ModelRouter, RoutingDecision, UsageSnapshot};

use crate::client::{Generation, GenerationParams, GenerationRequest, TextGenerator};
use crate::persona::AgentPersona;
use crate::store::HistoryStore;

/// Reply used when every model in the fallback chain fails.
const CANNED_REPLY: &str =
    "Sorry, my head is a little fuzzy right now 😅 Give me a minute and ask me again?";

/// Turns of shared history included in each prompt.
const PROMPT_HISTORY_WINDOW: usize = 12;

/// A finished agent turn.
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// Generated (or canned) text.
    pub content: String,
    /// The routing decision behind this reply.
    pub decision: RoutingDecision,
    /// Prompt tokens consumed (0 when degraded).
    pub tokens_in: u32,
    /// Completion tokens produced (0 when degraded).
    pub tokens_out: u32,
    /// True when the whole fallback chain failed and the canned reply was
    /// used instead.
    pub degraded: bool,
}

/// One persona wired to the routing and generation stack.
///
/// The conversation history and the router are shared: both agents in a
/// group get the same `Arc`s, so each sees what the other said and every
/// routing decision lands in one per-process usage counter.
pub struct CompanionAgent {
    persona: AgentPersona,
    classifier: Classifier,
    router: Arc<Mutex<ModelRouter>>,
    generator: Arc<dyn TextGenerator>,
    history: Arc<Mutex<ConversationHistory>>,
    store: Option<Arc<dyn HistoryStore>>,
    params: GenerationParams,
}

impl CompanionAgent {
    /// Create an agent. The router is constructed by the caller so tests
    /// can inject a scripted random source, and shared so both agents feed
    /// the same usage counter.
    pub fn new(
        persona: AgentPersona,
        router: Arc<Mutex<ModelRouter>>,
        generator: Arc<dyn TextGenerator>,
        history: Arc<Mutex<ConversationHistory>>,
    ) -> Self {
        Self {
            persona,
            classifier: Classifier::new(),
            router,
            generator,
            history,
            store: None,
            params: GenerationParams::default(),
        }
    }

    /// Mirror turns to a durable store.
    pub fn with_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override generation parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// This agent's persona.
    pub fn persona(&self) -> &AgentPersona {
        &self.persona
    }

    /// Read-only usage counters for diagnostics.
    pub async fn usage_stats(&self) -> UsageSnapshot {
        self.router.lock().await.usage_snapshot()
    }

    /// Answer a real user message. Records both the user turn and the
    /// agent turn in the shared history.
    pub async fn reply(
        &self,
        chat_key: &str,
        text: &str,
        override_model: Option<&str>,
    ) -> AgentReply {
        let user_turn = ConversationTurn::user(text);
        let reply = self.generate_turn(chat_key, text, override_model).await;
        self.record(chat_key, user_turn, &reply).await;
        reply
    }

    /// Produce an agent-initiated turn from an instruction (idle-burst
    /// content, interjections, counter-replies). Only the agent turn is
    /// recorded; the instruction itself never enters the history.
    pub async fn compose(&self, chat_key: &str, instruction: &str) -> AgentReply {
        let reply = self.generate_turn(chat_key, instruction, None).await;
        self.record_agent_only(chat_key, &reply).await;
        reply
    }

    async fn generate_turn(
        &self,
        chat_key: &str,
        prompt: &str,
        override_model: Option<&str>,
    ) -> AgentReply {
        let classification = self.classifier.classify(prompt);
        let decision = self
            .router
            .lock()
            .await
            .select_model(&classification, override_model);
        let history = self
            .history
            .lock()
            .await
            .recent(chat_key, PROMPT_HISTORY_WINDOW);

        for model in candidate_models(&decision.model) {
            let request = GenerationRequest {
                model: model.clone(),
                system_prompt: self.persona.system_prompt.clone(),
                history: history.clone(),
                user_prompt: prompt.to_string(),
                params: self.params.clone(),
            };
            match self.generator.generate(&request).await {
                Ok(Generation {
                    text,
                    tokens_in,
                    tokens_out,
                }) => {
                    debug!(
                        agent = %self.persona.id,
                        chat = %chat_key,
                        model = %model,
                        reason = %decision.reason,
                        "Generated reply"
                    );
                    return AgentReply {
                        content: text,
                        decision,
                        tokens_in,
                        tokens_out,
                        degraded: false,
                    };
                }
                Err(e) => {
                    warn!(
                        agent = %self.persona.id,
                        chat = %chat_key,
                        model = %model,
                        error = %e,
                        "Generation failed, trying next model in chain"
                    );
                }
            }
        }

        error!(
            agent = %self.persona.id,
            chat = %chat_key,
            model = %decision.model,
            category = %classification.category,
            "Fallback chain exhausted, using canned reply"
        );
        AgentReply {
            content: CANNED_REPLY.to_string(),
            decision,
            tokens_in: 0,
            tokens_out: 0,
            degraded: true,
        }
    }

    async fn record(&self, chat_key: &str, user_turn: ConversationTurn, reply: &AgentReply) {
        {
            let mut history = self.history.lock().await;
            history.push(chat_key, user_turn.clone());
        }
        self.mirror(chat_key, &user_turn, reply).await;
        self.record_agent_only(chat_key, reply).await;
    }

    async fn record_agent_only(&self, chat_key: &str, reply: &AgentReply) {
        let agent_turn = ConversationTurn::agent(&reply.content);
        {
            let mut history = self.history.lock().await;
            history.push(chat_key, agent_turn.clone());
        }
        self.mirror(chat_key, &agent_turn, reply).await;
    }

    /// Best-effort mirror to the durable store; failures are logged, never
    /// propagated.
    async fn mirror(&self, chat_key: &str, turn: &ConversationTurn, reply: &AgentReply) {
        let Some(store) = &self.store else {
            return;
        };
        let metadata = serde_json::json!({
            "agent": self.persona.id,
            "model": reply.decision.model,
            "reason": reply.decision.reason,
        });
        if let Err(e) = store.append(chat_key, turn, metadata).await {
            warn!(chat = %chat_key, error = %e, "Durable history append failed");
        }
    }
}

/// The routed model followed by its fallback chain, deduplicated, with
/// excluded models dropped.
fn candidate_models(model: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    if !is_excluded(model) {
        candidates.push(model.to_string());
    }
    for fallback in fallback_chain(model) {
        if !is_excluded(fallback) && !candidates.iter().any(|c| c == fallback) {
            candidates.push((*fallback).to_string());
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use tandem_core::ScriptedRandom;
    use tandem_router::RouterConfig;

    use crate::error::AgentError;
    use crate::store::InMemoryHistory;

    use super::*;

    /// Generator that fails the first `failures` calls, then echoes the
    /// model id it was asked for.
    struct FlakyGenerator {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyGenerator {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FlakyGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> crate::error::Result<Generation> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(AgentError::Generation("backend unavailable".into()));
            }
            Ok(Generation {
                text: format!("reply from {}", request.model),
                tokens_in: 10,
                tokens_out: 5,
            })
        }
    }

    fn shared_router() -> Arc<Mutex<ModelRouter>> {
        // High scripted draws keep the balancing rule on the primary model.
        let rng = Arc::new(ScriptedRandom::new(std::iter::repeat(0.99).take(64)));
        Arc::new(Mutex::new(ModelRouter::with_random_source(
            RouterConfig::default(),
            rng,
        )))
    }

    fn agent_with(generator: Arc<dyn TextGenerator>) -> CompanionAgent {
        let history = Arc::new(Mutex::new(ConversationHistory::new()));
        CompanionAgent::new(AgentPersona::primary(), shared_router(), generator, history)
    }

    #[tokio::test]
    async fn test_reply_happy_path_records_both_turns() {
        let agent = agent_with(Arc::new(FlakyGenerator::new(0)));
        let reply = agent.reply("group-1", "hello there!", None).await;
        assert!(!reply.degraded);
        assert!(reply.content.starts_with("reply from"));

        let history = agent.history.lock().await.get("group-1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "hello there!");
    }

    #[tokio::test]
    async fn test_fallback_chain_walked_on_failure() {
        // First call fails, so the reply comes from the next chain entry.
        let agent = agent_with(Arc::new(FlakyGenerator::new(1)));
        let reply = agent.reply("group-1", "hello there!", None).await;
        assert!(!reply.degraded);
        assert_eq!(reply.content, "reply from openai/gpt-4o-mini");
        // The decision still names the originally routed model.
        assert_eq!(reply.decision.model, "anthropic/claude-3.5-haiku");
    }

    #[tokio::test]
    async fn test_exhausted_chain_degrades_to_canned_reply() {
        let agent = agent_with(Arc::new(FlakyGenerator::new(100)));
        let reply = agent.reply("group-1", "hello there!", None).await;
        assert!(reply.degraded);
        assert_eq!(reply.content, CANNED_REPLY);
        assert_eq!(reply.tokens_out, 0);
        // The degraded turn is still recorded.
        assert_eq!(agent.history.lock().await.len("group-1"), 2);
    }

    #[tokio::test]
    async fn test_compose_records_only_agent_turn() {
        let agent = agent_with(Arc::new(FlakyGenerator::new(0)));
        agent
            .compose("group-1", "Share a light thought about tea")
            .await;
        let history = agent.history.lock().await.get("group-1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, tandem_core::TurnRole::Agent);
    }

    #[tokio::test]
    async fn test_turns_mirrored_to_store() {
        let store = Arc::new(InMemoryHistory::new());
        let agent =
            agent_with(Arc::new(FlakyGenerator::new(0))).with_store(store.clone());
        agent.reply("group-1", "hello there!", None).await;

        let stored = store.query("group-1", 10).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_usage_stats_advance() {
        let agent = agent_with(Arc::new(FlakyGenerator::new(0)));
        assert_eq!(agent.usage_stats().await.total, 0);
        agent.reply("group-1", "hello there!", None).await;
        assert_eq!(agent.usage_stats().await.total, 1);
    }

    #[tokio::test]
    async fn test_shared_router_counts_both_agents() {
        let router = shared_router();
        let history = Arc::new(Mutex::new(ConversationHistory::new()));
        let generator: Arc<dyn TextGenerator> = Arc::new(FlakyGenerator::new(0));
        let primary = CompanionAgent::new(
            AgentPersona::primary(),
            Arc::clone(&router),
            Arc::clone(&generator),
            Arc::clone(&history),
        );
        let shadow = CompanionAgent::new(
            AgentPersona::shadow(),
            Arc::clone(&router),
            generator,
            history,
        );

        primary.reply("group-1", "hello there!", None).await;
        shadow.compose("group-1", "Add a short aside").await;

        // Both decisions land in the same counter.
        assert_eq!(primary.usage_stats().await.total, 2);
        assert_eq!(shadow.usage_stats().await.total, 2);
    }

    #[test]
    fn test_candidate_models_skip_excluded_and_dupes() {
        let candidates = candidate_models("anthropic/claude-opus-4");
        assert_eq!(
            candidates,
            vec!["anthropic/claude-sonnet-4", "anthropic/claude-3.5-haiku"]
        );

        let candidates = candidate_models("anthropic/claude-3.5-haiku");
        assert_eq!(
            candidates,
            vec!["anthropic/claude-3.5-haiku", "openai/gpt-4o-mini"]
        );
    }
}
