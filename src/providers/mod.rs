//! AI provider integrations

pub mod gemini;

use thiserror::Error;

use crate::config::Config;

use gemini::{GeminiClient, GenerateContentRequest};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP client could not be built: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub enum Provider {
    Gemini(GeminiClient),
}

impl Provider {
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        Ok(Provider::Gemini(GeminiClient::new(config.gemini.clone())?))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini(_) => "gemini",
        }
    }

    /// Send one request and return the reply text
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ProviderError> {
        match self {
            Provider::Gemini(p) => p.generate(request).await,
        }
    }
}
