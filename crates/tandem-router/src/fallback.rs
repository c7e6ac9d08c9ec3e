//! Static cost exclusions and fallback chains.
//!
//! The exclusion list names models that are too expensive to ever return.
//! The fallback-chain table maps a model id to an ordered list of
//! substitutes; models without a specific entry use the default chain.

use crate::router::{MODEL_GPT4O, MODEL_GPT4O_MINI, MODEL_HAIKU, MODEL_OPUS, MODEL_O1, MODEL_SONNET};

/// Models excluded for cost control.
const EXCLUDED_MODELS: &[&str] = &[MODEL_OPUS, MODEL_O1];

/// Chain used when a model has no specific entry.
const DEFAULT_CHAIN: &[&str] = &[MODEL_HAIKU, MODEL_GPT4O_MINI];

/// True when the model id must never be returned by the router.
pub fn is_excluded(model: &str) -> bool {
    EXCLUDED_MODELS.contains(&model)
}

/// Ordered substitutes to try when a model is excluded or unavailable.
pub fn fallback_chain(model: &str) -> &'static [&'static str] {
    match model {
        MODEL_OPUS => &[MODEL_SONNET, MODEL_HAIKU],
        MODEL_O1 => &[MODEL_GPT4O, MODEL_GPT4O_MINI],
        _ => DEFAULT_CHAIN,
    }
}

/// First non-excluded substitute for a model.
///
/// Walks the model's own chain, then the default chain. The default chain
/// contains no excluded models, so this always resolves.
pub fn substitute(model: &str) -> &'static str {
    for candidate in fallback_chain(model) {
        if !is_excluded(candidate) {
            return candidate;
        }
    }
    for candidate in DEFAULT_CHAIN {
        if !is_excluded(candidate) {
            return candidate;
        }
    }
    MODEL_HAIKU
}
