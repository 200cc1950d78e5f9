//! Conversation types and state management
//!
//! `ConversationStore` is the single owner of the message log. It appends
//! turns, writes the whole log to durable storage under one fixed key, reads
//! it back on startup, and projects it into the Gemini request shape.

pub mod display;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::providers::gemini::{Content, GenerateContentRequest};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the serialized history
pub const HISTORY_KEY: &str = "conversationHistory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Older stored logs use `bot` for replies.
    #[serde(alias = "bot")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Ordered, append-only message log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl FromIterator<Message> for ConversationHistory {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

/// Where the instruction message lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionPolicy {
    /// Kept out of history and prepended once when a payload is built.
    #[default]
    PerRequest,
    /// Appended to history as a user message before every turn.
    PersistEveryTurn,
}

impl FromStr for InstructionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per_request" | "per-request" => Ok(Self::PerRequest),
            "persist_every_turn" | "persist-every-turn" | "legacy" => Ok(Self::PersistEveryTurn),
            other => Err(format!("unknown instruction policy: {}", other)),
        }
    }
}

impl fmt::Display for InstructionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerRequest => f.write_str("per_request"),
            Self::PersistEveryTurn => f.write_str("persist_every_turn"),
        }
    }
}

/// Owner of the conversation log and its persisted copy
pub struct ConversationStore {
    history: ConversationHistory,
    storage: Arc<dyn KeyValueStore>,
    instruction: String,
    policy: InstructionPolicy,
}

impl ConversationStore {
    /// Create a store and load whatever history is already persisted
    pub async fn open(
        storage: Arc<dyn KeyValueStore>,
        instruction: impl Into<String>,
        policy: InstructionPolicy,
    ) -> Self {
        let history = Self::restore(storage.as_ref()).await;
        tracing::debug!(messages = history.len(), "Restored conversation history");

        Self {
            history,
            storage,
            instruction: instruction.into(),
            policy,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn policy(&self) -> InstructionPolicy {
        self.policy
    }

    /// Append one message. Blank text is ignored and reported as `false`.
    pub fn append(&mut self, role: Role, text: impl Into<String>) -> bool {
        let text = text.into();
        if text.trim().is_empty() {
            return false;
        }
        self.history.push(Message { role, text });
        true
    }

    /// Record a new user submission, applying the instruction policy
    pub fn begin_turn(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if self.policy == InstructionPolicy::PersistEveryTurn {
            let instruction = self.instruction.clone();
            self.append(Role::User, instruction);
        }
        self.append(Role::User, text)
    }

    /// Project the full history into the outbound request body
    pub fn build_request_payload(&self) -> GenerateContentRequest {
        let mut contents = Vec::with_capacity(self.history.len() + 1);

        if self.policy == InstructionPolicy::PerRequest && !self.instruction.trim().is_empty() {
            contents.push(Content::from(&Message::user(self.instruction.as_str())));
        }
        contents.extend(self.history.iter().map(Content::from));

        GenerateContentRequest { contents }
    }

    /// Write the entire history under `HISTORY_KEY`. Failures are logged only.
    pub async fn persist(&self) {
        if let Err(e) = self.try_persist().await {
            tracing::warn!("Failed to persist conversation history: {}", e);
        }
    }

    async fn try_persist(&self) -> Result<(), PersistError> {
        let value = serde_json::to_string(&self.history)?;
        self.storage.set(HISTORY_KEY, &value).await?;
        Ok(())
    }

    /// Read the persisted history. Missing or unreadable data yields an empty log.
    pub async fn restore(storage: &dyn KeyValueStore) -> ConversationHistory {
        match Self::try_restore(storage).await {
            Ok(Some(history)) => history,
            Ok(None) => ConversationHistory::new(),
            Err(e) => {
                tracing::warn!("Ignoring persisted conversation history: {}", e);
                ConversationHistory::new()
            }
        }
    }

    async fn try_restore(storage: &dyn KeyValueStore) -> Result<Option<ConversationHistory>, PersistError> {
        let Some(value) = storage.get(HISTORY_KEY).await? else {
            return Ok(None);
        };
        let history: ConversationHistory = serde_json::from_str(&value)?;
        Ok(Some(history))
    }
}

#[derive(Debug, thiserror::Error)]
enum PersistError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),
}
