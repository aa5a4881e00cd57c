/*!
 * Prompt engineering for subtitle translation.
 *
 * This module provides:
 * - The instruction template sent in front of every batch
 * - A builder that fills in the target language and the batch units
 */

pub mod templates;

// Re-export main types
pub use templates::{PromptTemplate, TranslationPromptBuilder};
