use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderReply};

/// Ollama client for interacting with the Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model name to use for generation
    model: String,
    /// Sampling temperature
    temperature: f32,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: None,
            stream: false,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

/// Extract the generated text from a response body
///
/// Some Ollama versions stream JSONL even when asked not to; in that case
/// the `response` pieces of every line are concatenated.
pub fn parse_generation_body(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(body) {
        return Some(parsed.response);
    }

    let mut full_response = String::new();
    let mut parsed_any = false;
    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        if let Ok(chunk) = serde_json::from_str::<GenerationResponse>(line) {
            full_response.push_str(&chunk.response);
            parsed_any = true;
        }
    }

    parsed_any.then_some(full_response)
}

impl Ollama {
    /// Create a new Ollama client from a base URL such as `http://localhost:11434`
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Ollama uses HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            model: model.into(),
            temperature,
        })
    }
}

#[async_trait]
impl Provider for Ollama {
    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerationRequest::new(&self.model, prompt).temperature(self.temperature);

        let response = self.client.post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send request to Ollama API: {}", e)))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to get response text from Ollama API: {}", e)))?;

        if !status.is_success() {
            debug!("Ollama API error ({}): {}", status, body);
            return Ok(ProviderReply::status(status.as_u16()));
        }

        let text = parse_generation_body(&body);
        if text.is_none() {
            debug!(
                "Failed to parse Ollama API response (first 500 chars): {}",
                body.chars().take(500).collect::<String>()
            );
        }

        Ok(ProviderReply {
            status: status.as_u16(),
            text,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
