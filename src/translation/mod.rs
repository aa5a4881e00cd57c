/*!
 * Translation pipeline for subtitle batches.
 *
 * This module contains the core functionality for translating subtitles
 * through a text-generation provider. It is split into several submodules:
 *
 * - `batch`: Batch construction and the sequential batch loop
 * - `core`: The translation client and its result types
 * - `formatting`: Line-break sentinel handling and response cleanup
 * - `prompts`: Prompt templates and builders for translation
 * - `reassembly`: Writing translated batches back into the document
 * - `retry`: Retry policy and backoff
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchStrategy, BatchTranslator, BatchUnit, Batcher};
pub use self::core::{BatchOutcome, TranslationResult, TranslationService};
pub use self::formatting::{FormatPreserver, SENTINEL};
pub use self::reassembly::{ReassembledDocument, Reassembler, Section};
pub use self::retry::{AttemptFailure, Backoff, RetryDecision, RetryPolicy};

// Re-export prompt types
pub use self::prompts::{PromptTemplate, TranslationPromptBuilder};

// Submodules
pub mod batch;
pub mod core;
pub mod formatting;
pub mod prompts;
pub mod reassembly;
pub mod retry;
