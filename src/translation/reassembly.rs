/*!
 * Reassembly of translated batches.
 *
 * Puts every translated unit back at the line it came from and groups the
 * result into sections: the untouched prefix first, then one section per
 * batch.
 */

use crate::errors::SubtitleError;
use crate::subtitle_processor::{DialogueLine, SubtitleDocument, SubtitleLine};

use super::batch::{Batch, BatchStrategy};
use super::core::TranslationResult;

/// A contiguous run of lines of the output document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub lines: Vec<SubtitleLine>,
}

impl Section {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Render the section's lines joined by '\n'
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.render_with(&line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Translated document split into prefix and batch sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassembledDocument {
    sections: Vec<Section>,
}

impl ReassembledDocument {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Always `1 + number of batches`
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// The header/style section
    pub fn prefix(&self) -> &Section {
        &self.sections[0]
    }

    pub fn line_count(&self) -> usize {
        self.sections.iter().map(Section::line_count).sum()
    }

    /// Final text, every line in original order
    pub fn into_text(self) -> String {
        self.into_document().render()
    }

    pub fn into_document(self) -> SubtitleDocument {
        SubtitleDocument {
            lines: self.sections.into_iter().flat_map(|section| section.lines).collect(),
        }
    }
}

/// Writes translated units back into their document
#[derive(Debug, Clone, Copy, Default)]
pub struct Reassembler {
    strategy: BatchStrategy,
}

impl Reassembler {
    /// The strategy must be the one the batches were built with
    pub fn new(strategy: BatchStrategy) -> Self {
        Self { strategy }
    }

    pub fn reassemble(
        &self,
        document: &SubtitleDocument,
        batches: &[Batch],
        results: &[TranslationResult],
    ) -> Result<ReassembledDocument, SubtitleError> {
        if batches.len() != results.len() {
            return Err(SubtitleError::ReassemblyMismatch(format!(
                "{} batches but {} results",
                batches.len(),
                results.len()
            )));
        }

        let mut lines = document.lines.clone();

        for (batch, result) in batches.iter().zip(results) {
            if batch.len() != result.len() {
                return Err(SubtitleError::ReassemblyMismatch(format!(
                    "batch {} has {} units but {} translations",
                    batch.index + 1,
                    batch.len(),
                    result.len()
                )));
            }

            for (unit, translated) in batch.units.iter().zip(&result.units) {
                let line = lines.get_mut(unit.line_index).ok_or_else(|| {
                    SubtitleError::ReassemblyMismatch(format!(
                        "line {} is outside the document",
                        unit.line_index + 1
                    ))
                })?;

                line.text = match self.strategy {
                    BatchStrategy::WholeLine => translated.clone(),
                    BatchStrategy::Payload => DialogueLine::parse(&line.text).with_payload(translated),
                };
            }
        }

        // Section boundaries: prefix end, then the first line of every later batch
        let prefix_end = document.prefix().len();
        let mut starts = vec![0, prefix_end];
        starts.extend(batches.iter().skip(1).filter_map(Batch::first_line_index));

        let mut sections = Vec::with_capacity(1 + batches.len());
        let mut rest = lines.into_iter();
        let mut position = 0;

        for window in starts.windows(2) {
            let end = window[1].max(position);
            sections.push(Section {
                lines: rest.by_ref().take(end - position).collect(),
            });
            position = end;
        }

        if batches.is_empty() {
            // The prefix is the whole document
            if let Some(prefix) = sections.first_mut() {
                prefix.lines.extend(rest);
            }
            sections.truncate(1);
        } else {
            sections.push(Section { lines: rest.collect() });
        }

        Ok(ReassembledDocument { sections })
    }
}
