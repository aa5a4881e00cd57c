use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderReply};

/// Gemini client for the generateContent API
#[derive(Debug)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    endpoint: String,
    /// Model name
    model: String,
    /// API key, sent as the `key` query parameter
    api_key: String,
    /// Sampling temperature
    temperature: f32,
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
}

/// generateContent response, only the parts this client reads
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentRequest {
    /// A single-turn request carrying one prompt
    pub fn new(prompt: &str, temperature: f32) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig { temperature },
        }
    }
}

impl GenerateContentResponse {
    /// Text at `candidates[0].content.parts[0].text`
    pub fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        temperature: f32,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            temperature,
        })
    }

    /// Full request URL including the API key
    pub fn request_url(&self) -> Result<Url, ProviderError> {
        let base = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        Url::parse_with_params(&base, &[("key", self.api_key.as_str())])
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini endpoint '{}': {}", base, e)))
    }
}

#[async_trait]
impl Provider for Gemini {
    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError> {
        let url = self.request_url()?;
        let request = GenerateContentRequest::new(prompt, self.temperature);

        let response = self.client.post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send request to Gemini API: {}", e)))?;

        let status = response.status();
        let body = response.text().await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to read Gemini API response: {}", e)))?;

        if !status.is_success() {
            debug!("Gemini API error ({}): {}", status, body);
            return Ok(ProviderReply::status(status.as_u16()));
        }

        let text = match serde_json::from_str::<GenerateContentResponse>(&body) {
            Ok(parsed) => parsed.first_text(),
            Err(e) => {
                debug!("Unparseable Gemini response: {}", e);
                None
            }
        };

        Ok(ProviderReply {
            status: status.as_u16(),
            text,
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
