//! Semantic model router for Tandem.
//!
//! Takes a [`tandem_core::ClassificationResult`] and picks a `(provider,
//! model)` pair under cost and balance constraints:
//!
//! 1. explicit user override (honored verbatim, minus cost exclusions),
//! 2. high-complexity messages go to the high-capability model,
//! 3. an ordered table of category rules, first match wins,
//! 4. a ratio-balancing default that nudges traffic toward the configured
//!    primary/secondary split.
//!
//! Models on the static exclusion list are never returned; a fallback-chain
//! table supplies substitutes. The router performs no I/O and cannot fail;
//! generation failures are the caller's concern (retry down the provider's
//! fallback chain, then a canned reply).

pub mod config;
pub mod fallback;
pub mod router;
pub mod usage;

pub use config::RouterConfig;
pub use fallback::{fallback_chain, is_excluded, substitute};
pub use router::{ModelRouter, Provider, RoutingDecision};
pub use usage::{UsageCounter, UsageSnapshot};
