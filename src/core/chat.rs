//! Chat engine: the top-level turn handler
//!
//! The ChatEngine:
//! 1. Records the user's message in the conversation store
//! 2. Builds the request payload from the full history
//! 3. Sends it to the provider while the in-progress marker is raised
//! 4. Appends and persists the reply, or converts the failure to a notice
//!
//! Nothing escapes `send` as an error; every failure becomes a `TurnOutcome`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::conversation::display::{DisplayProjection, RenderedMessage};
use crate::conversation::{ConversationStore, Message, Role};
use crate::providers::gemini::FALLBACK_REPLY;
use crate::providers::{Provider, ProviderError};

/// Notice shown when the API could not be reached
pub const TRANSPORT_ERROR: &str = "Error: Unable to reach the server.";

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum TurnOutcome {
    /// Blank input; nothing happened
    Ignored,
    /// Reply from the model, already stored in history
    Reply(String),
    /// Failed turn; the text is shown but never stored
    Error(String),
}

/// Raised for the lifetime of a network call
struct InProgress {
    counter: Arc<AtomicUsize>,
}

impl InProgress {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InProgress {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The core chat engine
pub struct ChatEngine {
    store: Mutex<ConversationStore>,
    provider: Provider,
    display: DisplayProjection,
    in_flight: Arc<AtomicUsize>,
}

impl ChatEngine {
    pub fn new(store: ConversationStore, provider: Provider) -> Self {
        let display = DisplayProjection::new(store.instruction());
        Self {
            store: Mutex::new(store),
            provider,
            display,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether a provider call is currently running
    pub fn in_progress(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Run one turn for `input`
    pub async fn send(&self, input: &str) -> TurnOutcome {
        let request = {
            let mut store = self.store.lock().await;
            if !store.begin_turn(input) {
                return TurnOutcome::Ignored;
            }
            store.build_request_payload()
        };

        let _pending = InProgress::start(&self.in_flight);
        tracing::debug!(
            provider = self.provider.name(),
            entries = request.contents.len(),
            "Sending turn"
        );

        match self.provider.generate(&request).await {
            Ok(reply) => {
                let mut store = self.store.lock().await;
                let reply = if store.append(Role::Assistant, reply.clone()) {
                    reply
                } else {
                    store.append(Role::Assistant, FALLBACK_REPLY);
                    FALLBACK_REPLY.to_string()
                };
                store.persist().await;
                TurnOutcome::Reply(reply)
            }
            Err(ProviderError::Api { status, message }) => {
                tracing::error!(status, "Provider returned an error: {}", message);
                TurnOutcome::Error(format!("Error: {}", message))
            }
            Err(e) => {
                tracing::error!("Provider unreachable: {}", e);
                TurnOutcome::Error(TRANSPORT_ERROR.to_string())
            }
        }
    }

    /// Full replay of the stored history for display
    pub async fn history(&self) -> Vec<RenderedMessage> {
        let store = self.store.lock().await;
        self.display.render_history(store.history())
    }

    /// How a submitted user message appears in the chat view, if at all
    pub fn render_user(&self, input: &str) -> Option<RenderedMessage> {
        if input.trim().is_empty() {
            return None;
        }
        self.display.render_message(&Message::user(input))
    }

    /// How an outcome appears in the chat view, if at all
    pub fn render_outcome(&self, outcome: &TurnOutcome) -> Option<RenderedMessage> {
        match outcome {
            TurnOutcome::Ignored => None,
            TurnOutcome::Reply(text) => self.display.render_message(&Message::assistant(text.as_str())),
            TurnOutcome::Error(text) => Some(self.display.render_notice(text)),
        }
    }
}
