//! Gemini `generateContent` provider
//!
//! # Configuration
//!
//! ```toml
//! [llm]
//! endpoint = "https://generativelanguage.googleapis.com/v1"
//! model = "gemini-pro"
//! api_key_env = "GEMINI_API_KEY"
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::{Message, Role};

use super::ProviderError;

/// Reply shown when a success response has no usable text
pub const FALLBACK_REPLY: &str = "I couldn't understand that.";

/// Error message used when an error response carries none
pub const DEFAULT_API_ERROR: &str = "Bad Request";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Role tokens understood by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    User,
    Model,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => WireRole::User,
            Role::Assistant => WireRole::Model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One request entry: a role plus its content parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: WireRole,
    pub parts: Vec<Part>,
}

impl From<&Message> for Content {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.into(),
            parts: vec![Part {
                text: msg.text.clone(),
            }],
        }
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Take the first candidate's first part, or the fallback reply
pub fn parse_reply(body: &str) -> String {
    serde_json::from_str::<GenerateContentResponse>(body)
        .ok()
        .and_then(|r| r.candidates.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

/// Pull `error.message` out of an error body, or the default message
pub fn parse_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_API_ERROR.to_string())
}

/// Gemini provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Base URL including the API version
    pub endpoint: String,
    /// Sent as the `key` query parameter
    pub api_key: Option<String>,
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
        }
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Send a generateContent request and return the reply text
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ProviderError> {
        let mut req_builder = self.client.post(self.url());

        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.query(&[("key", api_key)]);
        }

        let response = req_builder
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %body, "Gemini error response");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: parse_error_message(&body),
            });
        }

        Ok(parse_reply(&body))
    }
}
