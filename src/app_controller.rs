use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::progress::{ProgressReporter, ProgressSink, ProgressState};
use crate::subtitle_processor::SubtitleDocument;
use crate::translation::{BatchTranslator, Batcher, Reassembler, TranslationService};

// @module: Application controller for subtitle processing

/// One input file of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFile {
    // @field: Display name, also used for the output name
    pub name: String,
    // @field: Where the content lives
    pub path: PathBuf,
    // @field: Overrides the job's output directory for this file
    pub output_dir: Option<PathBuf>,
}

impl JobFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            output_dir: None,
        }
    }

    /// Write the translation into `output_dir` instead of the job's directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }
}

/// A file that made it through the job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedFile {
    pub source_name: String,
    pub output_name: String,
    pub path: PathBuf,
    pub batches: usize,
    pub fallback_batches: usize,
}

/// A file the job had to leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of a whole job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: String,
    pub translated: Vec<TranslatedFile>,
    pub skipped: Vec<SkippedFile>,
}

impl JobReport {
    pub fn is_empty(&self) -> bool {
        self.translated.is_empty()
    }
}

/// Translated text of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedContent {
    pub text: String,
    pub batches: usize,
    pub fallback_batches: usize,
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Client shared by every job
    service: TranslationService,
}

impl Controller {
    // @method: Create a new controller with the provider named in the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::from_config(&config.translation)?;
        Ok(Self::with_service(config, service))
    }

    /// Create a controller around an existing translation service
    pub fn with_service(config: Config, service: TranslationService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate one subtitle document; never fails
    ///
    /// Batches report their progress as `file_progress` events under `file_label`.
    pub async fn translate_content(
        &self,
        content: &str,
        target_language: &str,
        file_label: &str,
        reporter: &mut ProgressReporter<'_>,
    ) -> TranslatedContent {
        let common = &self.config.translation.common;
        let document = SubtitleDocument::parse(content);
        let batches = Batcher::new(common.max_batch_size, self.service.strategy()).split(&document);

        debug!(
            "{}: {} dialogue lines in {} batches",
            file_label,
            document.dialogue_count(),
            batches.len()
        );

        if batches.is_empty() {
            return TranslatedContent {
                text: content.to_string(),
                batches: 0,
                fallback_batches: 0,
            };
        }

        let translator = BatchTranslator::new(self.service.clone());
        let results = translator
            .translate_batches(&batches, target_language, |processed, total| {
                let mut state = ProgressState::new(total);
                reporter.batches_done(file_label, state.advance_to(processed));
            })
            .await;

        let fallback_batches = results.iter().filter(|result| result.outcome.is_fallback()).count();

        let text = match Reassembler::new(self.service.strategy()).reassemble(&document, &batches, &results) {
            Ok(reassembled) => reassembled.into_text(),
            Err(e) => {
                warn!("{}: {}; keeping the original text", file_label, e);
                content.to_string()
            }
        };

        TranslatedContent {
            text,
            batches: batches.len(),
            fallback_batches,
        }
    }

    /// Read, translate and write one file
    pub async fn translate_file(
        &self,
        file: &JobFile,
        target_language: &str,
        output_dir: &Path,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<TranslatedFile> {
        let content = FileManager::read_to_string(&file.path)
            .with_context(|| format!("Cannot read {} as UTF-8 text", file.name))?;

        let translated = self.translate_content(&content, target_language, &file.name, reporter).await;

        let output_name = FileManager::translated_file_name(&file.name);
        let path = file.output_dir.as_deref().unwrap_or(output_dir).join(&output_name);
        FileManager::write_to_file(&path, &translated.text)?;

        Ok(TranslatedFile {
            source_name: file.name.clone(),
            output_name,
            path,
            batches: translated.batches,
            fallback_batches: translated.fallback_batches,
        })
    }

    /// Run a job over every file in order; a failing file is skipped, never fatal
    pub async fn run_job(
        &self,
        job_id: &str,
        files: &[JobFile],
        target_language: &str,
        output_dir: &Path,
        sink: &dyn ProgressSink,
    ) -> JobReport {
        let start_time = Instant::now();
        let multi_file = files.len() > 1;
        let inter_file_delay = Duration::from_millis(self.config.translation.common.inter_file_delay_ms);

        let mut reporter = ProgressReporter::new(job_id, files.len(), sink);
        reporter.start();

        info!("Job {}: translating {} file(s) to {}", job_id, files.len(), target_language);

        let mut report = JobReport {
            job_id: job_id.to_string(),
            translated: Vec::new(),
            skipped: Vec::new(),
        };

        for (index, file) in files.iter().enumerate() {
            if index > 0 && !inter_file_delay.is_zero() {
                debug!("Waiting {:?} before the next file", inter_file_delay);
                tokio::time::sleep(inter_file_delay).await;
            }

            match self.translate_file(file, target_language, output_dir, &mut reporter).await {
                Ok(translated) => {
                    if translated.fallback_batches > 0 {
                        warn!(
                            "{}: {} of {} batches kept their original text",
                            file.name, translated.fallback_batches, translated.batches
                        );
                    }
                    report.translated.push(translated);
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file.name, e);
                    report.skipped.push(SkippedFile {
                        name: file.name.clone(),
                        reason: format!("{:#}", e),
                    });
                }
            }

            if multi_file {
                reporter.file_done();
            }
        }

        reporter.complete();

        info!(
            "Job {} completed in {}: {} translated, {} skipped",
            job_id,
            Self::format_duration(start_time.elapsed()),
            report.translated.len(),
            report.skipped.len()
        );

        report
    }

    /// Format a duration for log output
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
