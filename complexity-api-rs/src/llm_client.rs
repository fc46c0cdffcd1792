// complexity-api-rs/src/llm_client.rs
//
// HTTP client for the Gemini generative-language API
//
// This module provides:
// - The `GenerativeModel` seam the analysis service calls through
// - A reqwest implementation against the `generateContent` REST endpoint
// - Error values that keep the upstream status and message for classification
//
// Configuration (.env file):
// - GEMINI_API_KEY: API key for the Gemini API
// - GEMINI_API_URL: API base URL (defaults to the public v1beta endpoint)
// - GEMINI_MODEL: Model to use (default: "gemini-1.5-flash")
// - GEMINI_TIMEOUT_SECS: Transport timeout for one call (default: 60)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::GeminiConfig;

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Low-randomness settings used for complexity analysis.
    pub const fn analysis() -> Self {
        Self {
            temperature: 0.1,
            top_k: 1,
            top_p: 0.8,
            max_output_tokens: 2048,
        }
    }
}

/// Failure of a single model call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The API answered with a non-success status
    #[error("Gemini API error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The transport gave up waiting
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Connection or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// The success body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ModelError {
    /// HTTP status reported by the API, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ModelError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A text-generation backend
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Whether a credential is available for calls
    fn is_configured(&self) -> bool;

    /// Send one prompt and return the generated text (possibly empty)
    async fn generate_content(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

/// Gemini REST client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    async fn generate_content(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, ModelError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();

        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: config,
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "Sending Gemini request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ModelError::Timeout(err.to_string())
                } else if err.is_connect() {
                    ModelError::Network(format!("Connection failed: {}", err))
                } else {
                    ModelError::Network(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => {
                    let detail = body.error.message.unwrap_or_else(|| status.to_string());
                    match body.error.status {
                        Some(code) => format!("[{}] {}", code, detail),
                        None => detail,
                    }
                }
                Err(_) if text.is_empty() => status.to_string(),
                Err(_) => text,
            };

            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: GenerateContentResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ModelError::Timeout(err.to_string())
            } else {
                ModelError::Parse(format!("Failed to parse response: {}", err))
            }
        })?;

        let text = data
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.map(str::to_string),
            api_url: "https://example.test/v1beta/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_generation_config_wire_names() {
        let value = serde_json::to_value(GenerationConfig::analysis()).unwrap();
        assert_eq!(value["topK"], 1);
        assert_eq!(value["maxOutputTokens"], 2048);
        assert!((value["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!((value["topP"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_endpoint_and_configuration() {
        let client = GeminiClient::new(&config(Some("key"))).unwrap();
        assert!(client.is_configured());
        assert_eq!(
            client.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );

        let unconfigured = GeminiClient::new(&config(None)).unwrap();
        assert!(!unconfigured.is_configured());
    }

    #[test]
    fn test_model_error_status() {
        let err = ModelError::Status {
            status: 429,
            message: "quota".to_string(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "Gemini API error (429): quota");
        assert_eq!(ModelError::Timeout("slow".to_string()).status(), None);
        assert_eq!(ModelError::Timeout("slow".to_string()).to_string(), "Request timeout: slow");
    }
}
