//! Durable key-value storage for conversation state
//!
//! The conversation log is written as one JSON value under a fixed key, so
//! the storage seam only needs whole-value reads and writes.

mod memory;
mod sqlite;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Which backend holds the conversation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Sqlite,
    /// Nothing survives a restart
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Errors from a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whole-value key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}
