//! Model selection.
//!
//! `ModelRouter::select_model` is the single decision point. It never
//! performs I/O and never fails: every input resolves to some non-excluded
//! model. The router owns the usage counter and updates it after each
//! finalized decision.

use std::sync::Arc;

use tracing::{debug, warn};

use tandem_core::{Category, ClassificationResult, RandomSource, ThreadRandom};

use crate::config::RouterConfig;
use crate::fallback::{is_excluded, substitute};
use crate::usage::{UsageCounter, UsageSnapshot};

/// High-capability model for complex messages.
pub const MODEL_SONNET: &str = "anthropic/claude-sonnet-4";
/// Default fast model of the primary provider.
pub const MODEL_HAIKU: &str = "anthropic/claude-3.5-haiku";
/// Secondary provider's capable model.
pub const MODEL_GPT4O: &str = "openai/gpt-4o";
/// Secondary provider's cheap model, used for ratio balancing.
pub const MODEL_GPT4O_MINI: &str = "openai/gpt-4o-mini";
/// Excluded for cost; substituted via the fallback chain.
pub const MODEL_OPUS: &str = "anthropic/claude-opus-4";
/// Excluded for cost; substituted via the fallback chain.
pub const MODEL_O1: &str = "openai/o1-preview";

/// External generative-model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Primary provider.
    Anthropic,
    /// Secondary provider.
    OpenAI,
}

impl Provider {
    /// Derive the provider from a model id prefix.
    pub fn of_model(model: &str) -> Self {
        if model.starts_with("anthropic/") {
            Self::Anthropic
        } else {
            Self::OpenAI
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Outcome of one routing decision. Derived fresh per message and consumed
/// by logging; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Chosen provider.
    pub provider: Provider,
    /// Chosen model id.
    pub model: String,
    /// Human-readable reason for the choice.
    pub reason: String,
    /// Display tag shown next to the reply.
    pub tag: &'static str,
}

/// One row in the ordered category rule table. First matching row wins;
/// rows are checked in declaration order regardless of which category won
/// the overall classification.
struct CategoryRoute {
    category: Category,
    min_score: f32,
    model: &'static str,
    reason: &'static str,
    tag: &'static str,
}

const CATEGORY_ROUTES: &[CategoryRoute] = &[
    CategoryRoute {
        category: Category::Reasoning,
        min_score: 3.0,
        model: MODEL_SONNET,
        reason: "complex reasoning",
        tag: "🧩",
    },
    CategoryRoute {
        category: Category::Emotional,
        min_score: 2.0,
        model: MODEL_HAIKU,
        reason: "emotional support",
        tag: "💚",
    },
    CategoryRoute {
        category: Category::Health,
        min_score: 2.0,
        model: MODEL_SONNET,
        reason: "health question",
        tag: "🩺",
    },
    CategoryRoute {
        category: Category::Creative,
        min_score: 3.0,
        model: MODEL_SONNET,
        reason: "creative writing",
        tag: "✍️",
    },
    CategoryRoute {
        category: Category::Knowledge,
        min_score: 2.0,
        model: MODEL_GPT4O,
        reason: "knowledge lookup",
        tag: "📚",
    },
];

/// Stateful model router.
pub struct ModelRouter {
    config: RouterConfig,
    usage: UsageCounter,
    rng: Arc<dyn RandomSource>,
}

impl ModelRouter {
    /// Create a router with the default random source.
    pub fn new(config: RouterConfig) -> Self {
        Self::with_random_source(config, Arc::new(ThreadRandom))
    }

    /// Create a router with an injected random source (tests).
    pub fn with_random_source(config: RouterConfig, rng: Arc<dyn RandomSource>) -> Self {
        let usage = UsageCounter::new(config.usage_ceiling);
        Self { config, usage, rng }
    }

    /// Pick a `(provider, model)` pair for a classified message.
    ///
    /// An explicit `override_model` bypasses the rule pipeline but is still
    /// subject to the cost exclusion list. After the decision is finalized
    /// the usage counter is updated.
    pub fn select_model(
        &mut self,
        classification: &ClassificationResult,
        override_model: Option<&str>,
    ) -> RoutingDecision {
        let decision = self.decide(classification, override_model);
        let decision = self.enforce_exclusion(decision);
        self.usage.record(decision.provider);
        debug!(
            model = %decision.model,
            provider = %decision.provider,
            category = %classification.category,
            reason = %decision.reason,
            "Routing decision"
        );
        decision
    }

    /// Read-only usage snapshot for diagnostics.
    pub fn usage_snapshot(&self) -> UsageSnapshot {
        self.usage.snapshot()
    }

    fn decide(
        &self,
        classification: &ClassificationResult,
        override_model: Option<&str>,
    ) -> RoutingDecision {
        if let Some(model) = override_model {
            return RoutingDecision {
                provider: Provider::of_model(model),
                model: model.to_string(),
                reason: "user override".to_string(),
                tag: "📌",
            };
        }

        if classification.complexity >= self.config.deep_complexity_threshold {
            return RoutingDecision {
                provider: Provider::Anthropic,
                model: MODEL_SONNET.to_string(),
                reason: "deep analysis".to_string(),
                tag: "🧠",
            };
        }

        for route in CATEGORY_ROUTES {
            if classification.score(route.category) >= route.min_score {
                return RoutingDecision {
                    provider: Provider::of_model(route.model),
                    model: route.model.to_string(),
                    reason: route.reason.to_string(),
                    tag: route.tag,
                };
            }
        }

        self.balance_default()
    }

    /// Default rule: nudge traffic toward the configured secondary share.
    ///
    /// When the secondary provider's observed ratio trails the target, pick
    /// it with probability equal to the target share boosted by the gap;
    /// otherwise the primary cheap model. Boosting by the gap (rather than
    /// using the bare gap as the probability) is what makes the observed
    /// split settle at the target instead of half of it: in equilibrium the
    /// selection probability must equal the observed share.
    fn balance_default(&self) -> RoutingDecision {
        let observed = self.usage.ratio(Provider::OpenAI);
        let gap = self.config.secondary_ratio - observed;
        if gap > 0.0 && self.rng.next_f64() < self.config.secondary_ratio + gap {
            return RoutingDecision {
                provider: Provider::OpenAI,
                model: MODEL_GPT4O_MINI.to_string(),
                reason: "usage balancing".to_string(),
                tag: "⚖️",
            };
        }
        RoutingDecision {
            provider: Provider::Anthropic,
            model: MODEL_HAIKU.to_string(),
            reason: "default".to_string(),
            tag: "⚡",
        }
    }

    /// Replace an excluded model with its cheapest allowed substitute.
    fn enforce_exclusion(&self, decision: RoutingDecision) -> RoutingDecision {
        if !is_excluded(&decision.model) {
            return decision;
        }
        let replacement = substitute(&decision.model);
        warn!(
            requested = %decision.model,
            replacement = %replacement,
            reason = %decision.reason,
            "Excluded model substituted"
        );
        RoutingDecision {
            provider: Provider::of_model(replacement),
            model: replacement.to_string(),
            ..decision
        }
    }
}
