/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService, which sends one batch at a
 * time to the configured provider, retries under the retry policy and falls
 * back to the original text whenever no usable translation comes back.
 */

use anyhow::Result;
use log::{debug, error, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::TranslationConfig;
use crate::language_utils;
use crate::providers::{self, Provider};
use crate::subtitle_processor::{DialogueLine, DIALOGUE_MARKER};

use super::batch::{Batch, BatchStrategy};
use super::formatting::FormatPreserver;
use super::prompts::TranslationPromptBuilder;
use super::retry::{AttemptFailure, RetryDecision, RetryPolicy};

/// How a batch ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every unit carries the provider's translation
    Translated,
    /// Retries ran out
    FallbackExhausted,
    /// The provider answered without usable text
    FallbackMalformed,
    /// The answer did not line up with the submitted units
    FallbackLineMismatch,
}

impl BatchOutcome {
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Translated)
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Translated => "translated",
            Self::FallbackExhausted => "retries exhausted",
            Self::FallbackMalformed => "malformed response",
            Self::FallbackLineMismatch => "response lines do not match the batch",
        };
        write!(f, "{}", text)
    }
}

/// One output unit per input unit of a batch, same order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    /// Translated (or original) units
    pub units: Vec<String>,
    /// What happened to the batch
    pub outcome: BatchOutcome,
}

impl TranslationResult {
    /// The batch's own units, untranslated
    pub fn fallback(batch: &Batch, outcome: BatchOutcome) -> Self {
        Self {
            units: batch.units.iter().map(|unit| unit.source.clone()).collect(),
            outcome,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Main translation service for subtitle translation
#[derive(Clone)]
pub struct TranslationService {
    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Retry policy applied to every provider call
    policy: RetryPolicy,

    /// What the batch units contain
    strategy: BatchStrategy,
}

impl TranslationService {
    /// Create a new translation service around a provider
    pub fn new(provider: Arc<dyn Provider>, policy: RetryPolicy, strategy: BatchStrategy) -> Self {
        Self {
            provider,
            policy,
            strategy,
        }
    }

    /// Create a translation service with the provider named in the configuration
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        let provider = providers::build_provider(config)?;
        let policy = RetryPolicy::from_millis(config.common.retry_count, config.common.retry_backoff_ms);
        Ok(Self::new(provider, policy, config.common.batch_strategy))
    }

    pub fn strategy(&self) -> BatchStrategy {
        self.strategy
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Translate one block of text; returns the input unchanged on failure
    pub async fn translate_text(&self, unit_text: &str, target_language: &str) -> String {
        if unit_text.trim().is_empty() {
            return unit_text.to_string();
        }

        let escaped = FormatPreserver::escape_line_breaks(unit_text);
        let prompt = self.build_prompt(&[escaped], target_language);

        match self.request(&prompt).await {
            Ok(answer) => {
                FormatPreserver::restore_line_breaks(FormatPreserver::strip_code_fence(answer.trim()))
            }
            Err(_) => unit_text.to_string(),
        }
    }

    /// Translate a batch; the result always has exactly one unit per input unit
    pub async fn translate_batch(&self, batch: &Batch, target_language: &str) -> TranslationResult {
        // Blank units keep their text and are never submitted
        let pending: Vec<usize> = batch.units.iter()
            .enumerate()
            .filter(|(_, unit)| !unit.source.trim().is_empty())
            .map(|(position, _)| position)
            .collect();

        if pending.is_empty() {
            return TranslationResult::fallback(batch, BatchOutcome::Translated);
        }

        let escaped: Vec<String> = pending.iter()
            .map(|&position| FormatPreserver::escape_line_breaks(&batch.units[position].source))
            .collect();
        let prompt = self.build_prompt(&escaped, target_language);

        let start_time = Instant::now();
        let answer = match self.request(&prompt).await {
            Ok(answer) => answer,
            Err(AttemptFailure::Malformed) => {
                return TranslationResult::fallback(batch, BatchOutcome::FallbackMalformed);
            }
            Err(_) => return TranslationResult::fallback(batch, BatchOutcome::FallbackExhausted),
        };
        debug!("{} answered batch {} in {:?}", self.provider.name(), batch.index + 1, start_time.elapsed());

        let lines = FormatPreserver::clean_response(&answer);
        if lines.len() != pending.len() {
            warn!(
                "Batch {}: expected {} lines, provider returned {}",
                batch.index + 1,
                pending.len(),
                lines.len()
            );
            return TranslationResult::fallback(batch, BatchOutcome::FallbackLineMismatch);
        }

        let mut units: Vec<String> = batch.units.iter().map(|unit| unit.source.clone()).collect();
        for (&position, line) in pending.iter().zip(lines) {
            match self.merge_unit(&units[position], line) {
                Some(merged) => units[position] = merged,
                None => {
                    warn!("Batch {}: line {} lost its dialogue structure", batch.index + 1, position + 1);
                    return TranslationResult::fallback(batch, BatchOutcome::FallbackLineMismatch);
                }
            }
        }

        TranslationResult {
            units,
            outcome: BatchOutcome::Translated,
        }
    }

    /// Combine a source unit with its translated line
    ///
    /// In whole-line mode only the payload is taken from the answer; the
    /// leading fields of the original line are kept as they were.
    fn merge_unit(&self, source: &str, translated: String) -> Option<String> {
        match self.strategy {
            BatchStrategy::Payload => Some(translated),
            BatchStrategy::WholeLine => {
                if !translated.starts_with(DIALOGUE_MARKER) {
                    return None;
                }
                let original = DialogueLine::parse(source);
                match (original.payload, DialogueLine::parse(&translated).payload) {
                    (None, _) => Some(source.to_string()),
                    (Some(_), Some(payload)) => Some(original.with_payload(payload)),
                    (Some(_), None) => None,
                }
            }
        }
    }

    fn build_prompt(&self, escaped_units: &[String], target_language: &str) -> String {
        let language_name = language_utils::display_name(target_language);
        TranslationPromptBuilder::new(&language_name, self.strategy)
            .with_units(escaped_units)
            .build()
    }

    /// Send a prompt until it yields text or the retry policy gives up
    async fn request(&self, prompt: &str) -> Result<String, AttemptFailure> {
        let mut attempt = 1;

        loop {
            let failure = match self.provider.complete(prompt).await {
                Ok(reply) if reply.is_success() => match reply.text {
                    Some(text) if !text.trim().is_empty() => {
                        debug!("{} answered on attempt {}", self.provider.name(), attempt);
                        return Ok(text);
                    }
                    _ => AttemptFailure::Malformed,
                },
                Ok(reply) => AttemptFailure::from_status(reply.status),
                Err(e) => AttemptFailure::Transport(e.to_string()),
            };

            match self.policy.decide(attempt, &failure) {
                RetryDecision::Retry(delay) => {
                    if failure == AttemptFailure::RateLimited {
                        warn!("Rate limit hit. Retrying in {:.1} seconds...", delay.as_secs_f64());
                    } else {
                        warn!(
                            "{} attempt {}/{} failed ({}), retrying in {:?}",
                            self.provider.name(),
                            attempt,
                            self.policy.max_attempts(),
                            failure,
                            delay
                        );
                    }
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp => {
                    error!(
                        "Batch translation error after {} attempt(s): {}; keeping original text",
                        attempt, failure
                    );
                    return Err(failure);
                }
            }
        }
    }
}
