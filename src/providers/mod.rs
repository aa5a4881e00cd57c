/*!
 * Provider implementations for different text-generation services.
 *
 * This module contains client implementations for the supported providers:
 * - Gemini: Google generateContent API
 * - Ollama: Local LLM server
 * - Mock: Scripted provider for tests
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// What a provider returned for one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    /// HTTP status of the response
    pub status: u16,
    /// Generated text at the expected location, if any
    pub text: Option<String>,
}

impl ProviderReply {
    /// A 200 reply carrying text
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            text: Some(text.into()),
        }
    }

    /// A reply with the given status and no text
    pub fn status(status: u16) -> Self {
        Self { status, text: None }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Common trait for all text-generation providers
///
/// The translation client only needs one operation: send a prompt, get back
/// a status and maybe some text. Non-success statuses are replies, not
/// errors; `Err` is reserved for requests that never produced a response.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send one prompt
    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Build the provider selected in the configuration
pub fn build_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let timeout_secs = config.get_timeout_secs();
    let temperature = config.common.temperature;

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Gemini => Arc::new(gemini::Gemini::new(
            config.get_endpoint(),
            config.get_model(),
            config.get_api_key(),
            temperature,
            timeout_secs,
        )?),
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::new(
            config.get_endpoint(),
            config.get_model(),
            temperature,
            timeout_secs,
        )?),
    };

    Ok(provider)
}

pub mod gemini;
pub mod mock;
pub mod ollama;
