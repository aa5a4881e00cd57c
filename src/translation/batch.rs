/*!
 * Batch translation processing.
 *
 * This module groups dialogue lines into bounded batches and runs them
 * through the translation service one after another, reporting progress
 * after every batch.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::subtitle_processor::{DialogueLine, SubtitleDocument};

use super::core::{BatchOutcome, TranslationResult, TranslationService};

/// What a batch unit carries to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    /// The complete `Dialogue:` line
    #[default]
    WholeLine,
    /// Only the free text after the ninth comma
    Payload,
}

/// One translatable dialogue line inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchUnit {
    /// Position of the line in the document
    pub line_index: usize,
    /// Text submitted for translation
    pub source: String,
}

/// Ordered, size-bounded group of units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 0-based position of the batch within its document
    pub index: usize,
    /// Units in document order
    pub units: Vec<BatchUnit>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Source texts in order
    pub fn sources(&self) -> Vec<&str> {
        self.units.iter().map(|unit| unit.source.as_str()).collect()
    }

    /// Document position of the first unit
    pub fn first_line_index(&self) -> Option<usize> {
        self.units.first().map(|unit| unit.line_index)
    }
}

/// Splits a document's dialogue lines into batches
#[derive(Debug, Clone, Copy)]
pub struct Batcher {
    max_batch_size: usize,
    strategy: BatchStrategy,
}

impl Batcher {
    /// A zero batch size is treated as one
    pub fn new(max_batch_size: usize, strategy: BatchStrategy) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            strategy,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn strategy(&self) -> BatchStrategy {
        self.strategy
    }

    /// Partition the translatable dialogue lines into batches, preserving order
    pub fn split(&self, document: &SubtitleDocument) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current = Vec::with_capacity(self.max_batch_size);

        for (line_index, line) in document.lines.iter().enumerate() {
            if !line.is_dialogue() {
                continue;
            }

            let source = match self.strategy {
                BatchStrategy::WholeLine => line.text.clone(),
                BatchStrategy::Payload => match DialogueLine::parse(&line.text).payload {
                    Some(payload) => payload.to_string(),
                    // Nothing to translate on a truncated line
                    None => continue,
                },
            };

            current.push(BatchUnit { line_index, source });

            if current.len() == self.max_batch_size {
                batches.push(Batch {
                    index: batches.len(),
                    units: std::mem::replace(&mut current, Vec::with_capacity(self.max_batch_size)),
                });
            }
        }

        if !current.is_empty() {
            batches.push(Batch {
                index: batches.len(),
                units: current,
            });
        }

        batches
    }
}

/// Batch translator for processing the batches of one document
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,
}

impl BatchTranslator {
    /// Create a new batch translator
    pub fn new(service: TranslationService) -> Self {
        Self { service }
    }

    /// Translate batches strictly in order, one request at a time
    ///
    /// `progress_callback` receives `(processed, total)` after every batch,
    /// whether it was translated or fell back to the original text.
    pub async fn translate_batches(
        &self,
        batches: &[Batch],
        target_language: &str,
        mut progress_callback: impl FnMut(usize, usize),
    ) -> Vec<TranslationResult> {
        let total_batches = batches.len();
        let mut results = Vec::with_capacity(total_batches);

        for batch in batches {
            debug!("Processing batch {} of {}", batch.index + 1, total_batches);

            let start_time = Instant::now();
            let result = self.service.translate_batch(batch, target_language).await;

            match result.outcome {
                BatchOutcome::Translated => {
                    debug!("Batch {} completed in {:?}", batch.index + 1, start_time.elapsed());
                }
                outcome => {
                    warn!("Batch {} kept its original text: {}", batch.index + 1, outcome);
                }
            }

            results.push(result);
            progress_callback(results.len(), total_batches);
        }

        results
    }
}
