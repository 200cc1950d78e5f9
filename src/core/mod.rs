//! Core chat engine
//!
//! This module contains the turn handler that ties the conversation store to
//! the provider.

mod chat;

pub use chat::{ChatEngine, TurnOutcome};
