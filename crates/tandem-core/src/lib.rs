//! Core components for the Tandem companion platform.
//!
//! This crate holds the leaf components that everything else builds on:
//!
//! - [`classifier`]: weighted keyword/regex scoring of free text into a
//!   fixed set of semantic categories, plus a derived complexity score.
//! - [`segments`]: an ephemeral, TTL-bounded cache of addressable text
//!   fragments split out of long generated responses.
//! - [`history`]: bounded per-chat conversation history with FIFO
//!   eviction.
//! - [`rng`]: a pluggable random source so randomized control flow stays
//!   testable.
//!
//! None of these components perform I/O; they are pure state machines over
//! in-memory data and are shared by the router and coordinator crates.

pub mod classifier;
pub mod error;
pub mod history;
pub mod rng;
pub mod segments;

pub use classifier::{Category, ClassificationResult, Classifier};
pub use error::{CoreError, Result};
pub use history::{ConversationHistory, ConversationTurn, TurnRole};
pub use rng::{RandomSource, ScriptedRandom, ThreadRandom};
pub use segments::{split_segments, SegmentCache, SegmentId};
