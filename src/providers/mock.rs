/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::echo()` - Answers with the submitted units unchanged
 * - `MockProvider::translating()` - Marks every unit's text as translated
 * - `MockProvider::scripted(..)` - Plays back a fixed sequence of replies
 * - `MockProvider::failing(..)` - Always answers with an error status
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderReply};
use crate::subtitle_processor::{DialogueLine, DIALOGUE_MARKER};

/// Marker prepended to translated text by `MockProvider::translating()`
pub const TRANSLATED_MARKER: &str = "[translated] ";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Return the submitted units as they are
    Echo,
    /// Prefix the text of every unit with `TRANSLATED_MARKER`
    Translating,
    /// Always return the same text
    Fixed(String),
    /// Always answer with the given status and no text
    Failing(u16),
    /// Every request fails before a response arrives
    Disconnected,
    /// Play back queued replies, then behave like `Translating`
    Scripted,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Replies for `MockBehavior::Scripted`
    script: Arc<Mutex<VecDeque<ProviderReply>>>,
    /// Every prompt received, in order
    prompts: Arc<Mutex<Vec<String>>>,
    /// Request counter
    request_count: Arc<AtomicUsize>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn translating() -> Self {
        Self::new(MockBehavior::Translating)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    pub fn failing(status: u16) -> Self {
        Self::new(MockBehavior::Failing(status))
    }

    pub fn disconnected() -> Self {
        Self::new(MockBehavior::Disconnected)
    }

    /// Replies are consumed one per request
    pub fn scripted(replies: impl IntoIterator<Item = ProviderReply>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(replies);
        provider
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copies of every prompt received
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// The units part of a prompt (everything after the instruction block)
    pub fn units_of(prompt: &str) -> Vec<&str> {
        match prompt.split_once("\n\n") {
            Some((_, units)) => units.split('\n').collect(),
            None => Vec::new(),
        }
    }

    /// What `Translating` answers for a prompt
    pub fn translate_units(prompt: &str) -> String {
        Self::units_of(prompt)
            .into_iter()
            .map(Self::translate_unit)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn translate_unit(unit: &str) -> String {
        if unit.starts_with(DIALOGUE_MARKER) {
            let dialogue = DialogueLine::parse(unit);
            if let Some(payload) = dialogue.payload {
                return dialogue.with_payload(&format!("{}{}", TRANSLATED_MARKER, payload));
            }
            return unit.to_string();
        }
        format!("{}{}", TRANSLATED_MARKER, unit)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, prompt: &str) -> Result<ProviderReply, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        match &self.behavior {
            MockBehavior::Echo => Ok(ProviderReply::ok(Self::units_of(prompt).join("\n"))),
            MockBehavior::Translating => Ok(ProviderReply::ok(Self::translate_units(prompt))),
            MockBehavior::Fixed(text) => Ok(ProviderReply::ok(text.clone())),
            MockBehavior::Failing(status) => Ok(ProviderReply::status(*status)),
            MockBehavior::Disconnected => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),
            MockBehavior::Scripted => {
                let next = self.script.lock().pop_front();
                Ok(next.unwrap_or_else(|| ProviderReply::ok(Self::translate_units(prompt))))
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
