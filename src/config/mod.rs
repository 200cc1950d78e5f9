//! Application configuration

pub mod file;
pub mod instruction;

use std::env;
use std::path::PathBuf;

use crate::conversation::InstructionPolicy;
use crate::providers::gemini::{GeminiConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::storage::StorageKind;

pub use file::FileConfig;

const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub gemini: GeminiConfig,
    pub storage: StorageKind,
    pub data_dir: PathBuf,
    pub instruction: String,
    pub instruction_policy: InstructionPolicy,
}

impl Config {
    /// Read the process environment, layered over `CHAT_CONFIG` if it names a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let file = match env::var("CHAT_CONFIG") {
            Ok(path) => FileConfig::from_file(&PathBuf::from(path))?,
            Err(_) => FileConfig::default(),
        };
        Self::from_sources(file, |key| env::var(key).ok())
    }

    /// Merge a file config with a variable lookup; the lookup wins
    pub fn from_sources<F>(file: FileConfig, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match var("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ConfigError::Validation(format!("PORT is not a valid port: {}", p)))?,
            None => file.server.port.unwrap_or(3000),
        };

        let timeout_secs = match var("GEMINI_TIMEOUT_SECS") {
            Some(t) => t.parse().map_err(|_| {
                ConfigError::Validation(format!("GEMINI_TIMEOUT_SECS is not a number: {}", t))
            })?,
            None => file.llm.timeout_secs.unwrap_or(120),
        };

        let instruction_policy = match var("CHAT_INSTRUCTION_POLICY") {
            Some(p) => p.parse().map_err(ConfigError::Validation)?,
            None => file.chat.instruction_policy.unwrap_or_default(),
        };

        let storage = match var("CHAT_STORAGE") {
            Some(s) => s.parse().map_err(ConfigError::Validation)?,
            None => file.chat.storage.unwrap_or_default(),
        };

        let instruction = var("CHAT_INSTRUCTION")
            .or(file.chat.instruction)
            .unwrap_or_else(|| instruction::DEFAULT.to_string());
        if instruction.trim().is_empty() {
            return Err(ConfigError::Validation("instruction must not be empty".into()));
        }

        let api_key_env = file
            .llm
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());

        Ok(Self {
            host: var("HOST")
                .or(file.server.host)
                .unwrap_or_else(|| "127.0.0.1".into()),
            port,
            gemini: GeminiConfig {
                endpoint: var("GEMINI_ENDPOINT")
                    .or(file.llm.endpoint)
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
                api_key: var(&api_key_env).filter(|k| !k.is_empty()),
                model: var("GEMINI_MODEL")
                    .or(file.llm.model)
                    .unwrap_or_else(|| DEFAULT_MODEL.into()),
                timeout_secs,
            },
            storage,
            data_dir: var("CHAT_DATA_DIR")
                .map(PathBuf::from)
                .or(file.chat.data_dir)
                .unwrap_or_else(|| PathBuf::from("./data")),
            instruction,
            instruction_policy,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(FileConfig::default(), lookup(&[])).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.gemini, GeminiConfig::default());
        assert_eq!(config.storage, StorageKind::Sqlite);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.instruction, instruction::DEFAULT);
        assert_eq!(config.instruction_policy, InstructionPolicy::PerRequest);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::from_toml(
            r#"
[server]
port = 8080

[llm]
model = "from-file"
api_key_env = "MY_KEY"

[chat]
instruction_policy = "persist_every_turn"
"#,
        )
        .unwrap();

        let config = Config::from_sources(
            file,
            lookup(&[
                ("GEMINI_MODEL", "from-env"),
                ("MY_KEY", "secret"),
                ("GEMINI_API_KEY", "ignored"),
                ("CHAT_STORAGE", "Memory"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini.model, "from-env");
        assert_eq!(config.gemini.api_key.as_deref(), Some("secret"));
        assert_eq!(config.instruction_policy, InstructionPolicy::PersistEveryTurn);
        assert_eq!(config.storage, StorageKind::Memory);
    }

    #[test]
    fn test_invalid_values() {
        let bad_port = Config::from_sources(FileConfig::default(), lookup(&[("PORT", "http")]));
        assert!(matches!(bad_port, Err(ConfigError::Validation(_))));

        let bad_policy = Config::from_sources(
            FileConfig::default(),
            lookup(&[("CHAT_INSTRUCTION_POLICY", "whenever")]),
        );
        assert!(matches!(bad_policy, Err(ConfigError::Validation(_))));

        let blank = Config::from_sources(FileConfig::default(), lookup(&[("CHAT_INSTRUCTION", "  ")]));
        assert!(matches!(blank, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_api_key_is_unset() {
        let config =
            Config::from_sources(FileConfig::default(), lookup(&[("GEMINI_API_KEY", "")])).unwrap();
        assert!(config.gemini.api_key.is_none());
    }
}
