/*!
 * Progress reporting for translation jobs.
 *
 * A job reports batch progress per file and file progress per job through a
 * `ProgressSink`. The server hands out one broadcast channel per job id from
 * the `ProgressHub`, so listeners only ever see the job they asked for.
 */

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Buffered events per job channel
pub const CHANNEL_CAPACITY: usize = 256;

/// Monotonic `(processed, total)` counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressState {
    processed: usize,
    total: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self { processed: 0, total }
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Count one more finished unit; never exceeds `total`
    pub fn advance(&mut self) -> Self {
        self.processed = (self.processed + 1).min(self.total);
        *self
    }

    /// Set the processed count; never moves backwards or past `total`
    pub fn advance_to(&mut self, processed: usize) -> Self {
        self.processed = processed.clamp(self.processed, self.total);
        *self
    }

    /// Completion in percent; an empty job is complete
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processed == self.total
    }
}

/// Event pushed to progress listeners
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProgressEvent {
    /// Batches finished within one file
    FileProgress {
        file: String,
        processed: usize,
        total: usize,
        percent: f64,
    },
    /// Files finished within the job
    JobProgress { processed: usize, total: usize },
    /// The job is done; always the last event of a job
    Completed {
        #[serde(rename = "jobId")]
        job_id: String,
    },
}

impl ProgressEvent {
    pub fn file_progress(file: &str, state: ProgressState) -> Self {
        Self::FileProgress {
            file: file.to_string(),
            processed: state.processed(),
            total: state.total(),
            percent: state.percent(),
        }
    }

    pub fn job_progress(state: ProgressState) -> Self {
        Self::JobProgress {
            processed: state.processed(),
            total: state.total(),
        }
    }

    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::FileProgress { .. } => "file_progress",
            Self::JobProgress { .. } => "progress",
            Self::Completed { .. } => "complete",
        }
    }

    /// JSON payload of the event
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Lifecycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Receiver of progress events; fire-and-forget
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Publishes events on a job's broadcast channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(sender: broadcast::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        // No listener is not an error
        let _ = self.sender.send(event);
    }
}

/// Drives terminal progress bars for the offline CLI
pub struct ProgressBarSink {
    multi_progress: MultiProgress,
    job_bar: ProgressBar,
    file_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressBarSink {
    pub fn new(total_files: usize) -> Self {
        let multi_progress = MultiProgress::new();
        let job_bar = multi_progress.add(ProgressBar::new(total_files as u64));
        job_bar.set_style(Self::style("files"));

        Self {
            multi_progress,
            job_bar,
            file_bar: Mutex::new(None),
        }
    }

    fn style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }
}

impl ProgressSink for ProgressBarSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FileProgress { file, processed, total, .. } => {
                let mut file_bar = self.file_bar.lock();
                let bar = file_bar.get_or_insert_with(|| {
                    let bar = self.multi_progress.add(ProgressBar::new(total as u64));
                    bar.set_style(Self::style("batches"));
                    bar
                });
                bar.set_length(total as u64);
                bar.set_position(processed as u64);
                bar.set_message(file);
                if processed == total {
                    bar.finish_and_clear();
                    *file_bar = None;
                }
            }
            ProgressEvent::JobProgress { processed, .. } => {
                self.job_bar.set_position(processed as u64);
            }
            ProgressEvent::Completed { .. } => {
                // Single-file jobs never emit JobProgress
                if let Some(length) = self.job_bar.length() {
                    self.job_bar.set_position(length);
                }
                self.job_bar.finish_with_message("done");
            }
        }
    }
}

/// Tracks one job and emits its events in order
pub struct ProgressReporter<'a> {
    job_id: String,
    phase: JobPhase,
    files: ProgressState,
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(job_id: impl Into<String>, total_files: usize, sink: &'a dyn ProgressSink) -> Self {
        Self {
            job_id: job_id.into(),
            phase: JobPhase::Pending,
            files: ProgressState::new(total_files),
            sink,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn files(&self) -> ProgressState {
        self.files
    }

    /// Pending -> InProgress; no event
    pub fn start(&mut self) {
        if self.phase == JobPhase::Pending {
            self.phase = JobPhase::InProgress;
        }
    }

    /// Report batch progress of the file being translated
    pub fn batches_done(&mut self, file: &str, state: ProgressState) {
        if self.phase == JobPhase::Completed {
            return;
        }
        self.start();
        self.sink.emit(ProgressEvent::file_progress(file, state));
    }

    /// Count one finished file, translated or skipped
    pub fn file_done(&mut self) {
        if self.phase == JobPhase::Completed {
            return;
        }
        self.start();
        let state = self.files.advance();
        self.sink.emit(ProgressEvent::job_progress(state));
    }

    /// Emit the completion marker exactly once
    pub fn complete(&mut self) {
        if self.phase == JobPhase::Completed {
            return;
        }
        self.phase = JobPhase::Completed;
        self.sink.emit(ProgressEvent::Completed {
            job_id: self.job_id.clone(),
        });
    }
}

/// Per-job broadcast channels keyed by job id
#[derive(Debug, Default)]
pub struct ProgressHub {
    channels: Mutex<HashMap<String, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, job_id: &str) -> broadcast::Sender<ProgressEvent> {
        self.channels
            .lock()
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Listen to a job; allowed before the job starts
    pub fn subscribe(&self, job_id: &str) -> broadcast::Receiver<ProgressEvent> {
        self.sender(job_id).subscribe()
    }

    /// Sink the job publishes on
    pub fn open(&self, job_id: &str) -> ChannelSink {
        debug!("Opening progress channel for job {}", job_id);
        ChannelSink::new(self.sender(job_id))
    }

    /// Drop the job's channel; listeners see the stream end once its sinks are gone
    pub fn close(&self, job_id: &str) {
        if self.channels.lock().remove(job_id).is_some() {
            debug!("Closed progress channel for job {}", job_id);
        }
    }

    pub fn is_open(&self, job_id: &str) -> bool {
        self.channels.lock().contains_key(job_id)
    }
}
