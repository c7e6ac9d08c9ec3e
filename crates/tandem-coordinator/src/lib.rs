//! Dual-agent coordinator for Tandem.
//!
//! Owns the two logical agents of a deployment and everything time-shaped
//! around them:
//!
//! - per-group idle timers with randomized delays, reset (abort + replace)
//!   on every recorded activity, user or agent, so at most one timer is
//!   ever pending per group;
//! - autonomous multi-turn "idle chat" bursts once a group has been quiet
//!   past the window, gated by a re-check of real idleness and a per-group
//!   cooldown, and abandoned mid-sequence when a real message arrives;
//! - shadow-agent interjections after the primary replies, with a bounded
//!   one-hop counter-reply bounce;
//! - a typed interjection event bus so the hosting application can observe
//!   cross-agent chatter;
//! - a shared segment cache fed by every outbound reply, so long responses
//!   stay addressable piece by piece for later user actions.
//!
//! Per group, the life cycle is Active -> Idle (timer fired) -> Bursting ->
//! Active again on any real user message.

pub mod activity;
pub mod burst;
pub mod bus;
pub mod config;
pub mod coordinator;
pub mod error;

pub use activity::ActivityRegistry;
pub use burst::{default_tasks, pick_task, BurstTask};
pub use bus::{InterjectionBus, InterjectionEvent};
pub use config::CoordinatorConfig;
pub use coordinator::{DualAgentCoordinator, InboundMessage};
pub use error::{CoordinatorError, Result};
