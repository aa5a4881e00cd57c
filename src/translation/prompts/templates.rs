/*!
 * Prompt templates for subtitle translation.
 *
 * The model receives one instruction block followed by the batch units,
 * one per line, and must answer with the same number of lines.
 */

use crate::translation::batch::BatchStrategy;
use crate::translation::formatting::SENTINEL;

/// Instruction template for batch translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default instructions for subtitle batch translation.
    pub const SUBTITLE_BATCH: &'static str = r#"Translate the following subtitle lines to {target_language}.
Rules:
- Keep exactly one output line for every input line, in the same order.
- Do not insert additional line breaks and do not merge lines.
{marker_rule}- DO NOT replace "{sentinel}" with other characters or translate it.
- ONLY return the translated text without any additional explanations, notes, or formatting."#;

    /// Extra rule used when whole dialogue lines are submitted.
    pub const MARKER_RULE: &'static str = "- Do not alter or remove the literal \"Dialogue:\" marker or any of the comma-separated fields before the text; translate only the text after the ninth comma.\n";

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default batch template.
    pub fn subtitle_batch() -> Self {
        Self::new(Self::SUBTITLE_BATCH)
    }

    /// Render the template with the given variables.
    pub fn render(&self, target_language: &str, strategy: BatchStrategy) -> String {
        let marker_rule = match strategy {
            BatchStrategy::WholeLine => Self::MARKER_RULE,
            BatchStrategy::Payload => "",
        };
        self.template
            .replace("{target_language}", target_language)
            .replace("{marker_rule}", marker_rule)
            .replace("{sentinel}", SENTINEL)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::subtitle_batch()
    }
}

/// Builder for the full prompt of one batch.
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder {
    target_language: String,
    strategy: BatchStrategy,
    template: PromptTemplate,
    units: Vec<String>,
}

impl TranslationPromptBuilder {
    /// Create a new prompt builder.
    pub fn new(target_language: &str, strategy: BatchStrategy) -> Self {
        Self {
            target_language: target_language.to_string(),
            strategy,
            template: PromptTemplate::default(),
            units: Vec::new(),
        }
    }

    /// Set the (already escaped) units to translate.
    pub fn with_units<S: AsRef<str>>(mut self, units: &[S]) -> Self {
        self.units = units.iter().map(|u| u.as_ref().to_string()).collect();
        self
    }

    /// Build the final prompt.
    pub fn build(&self) -> String {
        format!(
            "{}\n\n{}",
            self.template.render(&self.target_language, self.strategy),
            self.units.join("\n")
        )
    }
}
