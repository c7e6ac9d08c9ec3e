//! Companion agents for Tandem.
//!
//! This crate holds the two logical agents (primary and shadow) and the
//! seams to everything external:
//!
//! - [`client`]: the OpenRouter chat-completions client behind the
//!   [`TextGenerator`] trait.
//! - [`transport`]: the [`ChatTransport`] trait for the messaging layer,
//!   including the degrade-to-fresh-send recovery for replies to deleted
//!   messages.
//! - [`store`]: the [`HistoryStore`] trait for the external durable store.
//! - [`persona`]: primary and shadow persona definitions.
//! - [`agent`]: [`CompanionAgent`], which classifies, routes, generates
//!   with fallback-chain retries, and falls back to a canned reply when
//!   every model in the chain fails.

pub mod agent;
pub mod client;
pub mod error;
pub mod persona;
pub mod store;
pub mod transport;

pub use agent::{AgentReply, CompanionAgent};
pub use client::{
    Generation, GenerationParams, GenerationRequest, OpenRouterClient, TextGenerator,
};
pub use error::{AgentError, Result};
pub use persona::AgentPersona;
pub use store::{HistoryStore, InMemoryHistory};
pub use transport::{send_with_reply_fallback, ChatTransport, SendOptions, TransportError};
