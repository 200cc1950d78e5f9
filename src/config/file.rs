//! Optional configuration file loaded from TOML
//!
//! Every key is optional; environment variables take precedence over
//! anything set here.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [llm]
//! model = "gemini-1.5-flash"
//! api_key_env = "MY_GEMINI_KEY"
//!
//! [chat]
//! instruction_policy = "persist_every_turn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::conversation::InstructionPolicy;
use crate::storage::StorageKind;

use super::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub llm: LlmSection,

    #[serde(default)]
    pub chat: ChatSection,
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig = toml::from_str(content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,
}

/// Gemini connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL including the API version
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatSection {
    #[serde(default)]
    pub instruction: Option<String>,

    #[serde(default)]
    pub instruction_policy: Option<InstructionPolicy>,

    #[serde(default)]
    pub storage: Option<StorageKind>,

    /// Directory holding the SQLite database
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 8080

[llm]
model = "gemini-1.5-flash"
endpoint = "https://generativelanguage.googleapis.com/v1beta"
api_key_env = "MY_GEMINI_KEY"
timeout_secs = 30

[chat]
instruction = "Answer like a pirate."
instruction_policy = "persist_every_turn"
storage = "memory"
data_dir = "/var/lib/gemini-chat"
"#;

    #[test]
    fn test_parse_config() {
        let config = FileConfig::from_toml(SAMPLE_CONFIG).unwrap();

        assert_eq!(config.server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.server.port, Some(8080));
        assert_eq!(config.llm.model.as_deref(), Some("gemini-1.5-flash"));
        assert_eq!(config.llm.api_key_env.as_deref(), Some("MY_GEMINI_KEY"));
        assert_eq!(config.llm.timeout_secs, Some(30));
        assert_eq!(config.chat.instruction_policy, Some(InstructionPolicy::PersistEveryTurn));
        assert_eq!(config.chat.storage, Some(StorageKind::Memory));
        assert_eq!(config.chat.data_dir, Some(PathBuf::from("/var/lib/gemini-chat")));
    }

    #[test]
    fn test_empty_config() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_bad_policy_is_rejected() {
        let err = FileConfig::from_toml("[chat]\ninstruction_policy = \"sometimes\"\n");
        assert!(matches!(err, Err(ConfigError::Toml(_))));
    }
}
