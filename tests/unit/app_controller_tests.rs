/*!
 * Tests for job orchestration in the application controller
 */

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;

use subtrans::app_controller::{Controller, JobFile};
use subtrans::progress::{NullSink, ProgressEvent, ProgressReporter};
use subtrans::providers::mock::{MockProvider, TRANSLATED_MARKER};
use subtrans::translation::BatchStrategy;
use crate::common::{self, RecordingSink};

/// A single file job writes next to the configured output directory
#[tokio::test]
async fn test_run_job_withSingleFile_shouldWritePrefixedOutput() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let input = common::create_test_file(workspace.path(), "episode.ass", &common::ass_document(4))?;
    let controller = common::controller_with(Arc::new(MockProvider::translating()), common::test_config(workspace.path()));

    let report = controller
        .run_job("job1", &[JobFile::new("episode.ass", &input)], "fr", workspace.path(), &NullSink)
        .await;

    assert_eq!(report.translated.len(), 1);
    let translated = &report.translated[0];
    assert_eq!(translated.output_name, "translated_episode.ass");
    assert_eq!(translated.path, workspace.path().join("translated_episode.ass"));
    assert_eq!(translated.fallback_batches, 0);

    let output = std::fs::read_to_string(&translated.path)?;
    assert!(output.starts_with(common::ASS_HEADER));
    assert_eq!(common::count_dialogue(&output), 4);
    assert_eq!(output.matches(TRANSLATED_MARKER).count(), 4);
    Ok(())
}

/// A file that is not UTF-8 is skipped while the others are translated
#[tokio::test]
async fn test_run_job_withInvalidUtf8File_shouldSkipItAndContinue() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let good = common::create_test_file(workspace.path(), "good.ass", &common::ass_document(2))?;
    let bad = workspace.path().join("bad.ass");
    std::fs::write(&bad, [0xff, 0xfe, 0x00, 0x41])?;

    let sink = RecordingSink::new();
    let controller = common::controller_with(Arc::new(MockProvider::translating()), common::test_config(workspace.path()));
    let files = vec![JobFile::new("bad.ass", &bad), JobFile::new("good.ass", &good)];

    let report = controller.run_job("job2", &files, "fr", workspace.path(), &sink).await;

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].name, "bad.ass");
    assert_eq!(report.translated.len(), 1);
    assert_eq!(report.translated[0].source_name, "good.ass");

    let job_events: Vec<ProgressEvent> = sink
        .events()
        .into_iter()
        .filter(|event| !matches!(event, ProgressEvent::FileProgress { .. }))
        .collect();
    assert_eq!(
        job_events,
        vec![
            ProgressEvent::JobProgress { processed: 1, total: 2 },
            ProgressEvent::JobProgress { processed: 2, total: 2 },
            ProgressEvent::Completed { job_id: "job2".to_string() },
        ]
    );
    Ok(())
}

/// A file without dialogue is copied through and reports no increments
#[tokio::test]
async fn test_run_job_withoutDialogue_shouldOnlyEmitCompletion() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let input = common::create_test_file(workspace.path(), "empty.ass", common::ASS_HEADER)?;
    let mock = MockProvider::translating();
    let sink = RecordingSink::new();
    let controller = common::controller_with(Arc::new(mock.clone()), common::test_config(workspace.path()));

    let report = controller
        .run_job("job3", &[JobFile::new("empty.ass", &input)], "fr", workspace.path(), &sink)
        .await;

    assert_eq!(mock.request_count(), 0);
    assert_eq!(std::fs::read_to_string(&report.translated[0].path)?, common::ASS_HEADER);
    assert_eq!(sink.event_names(), vec!["complete"]);
    Ok(())
}

/// Per-file output directories take precedence over the job directory
#[tokio::test]
async fn test_run_job_withFileOutputDir_shouldWriteThere() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let elsewhere = common::create_temp_dir()?;
    let input = common::create_test_file(workspace.path(), "a.ass", &common::ass_document(1))?;
    let controller = common::controller_with(Arc::new(MockProvider::translating()), common::test_config(workspace.path()));
    let file = JobFile::new("a.ass", &input).with_output_dir(elsewhere.path());

    let report = controller.run_job("job4", &[file], "fr", workspace.path(), &NullSink).await;

    assert_eq!(report.translated[0].path, elsewhere.path().join("translated_a.ass"));
    assert!(report.translated[0].path.exists());
    Ok(())
}

/// Batch progress is reported per file with growing counts
#[tokio::test]
async fn test_translate_content_shouldReportFileProgressPerBatch() {
    let workspace = tempfile::tempdir().unwrap();
    let mut config = common::test_config(workspace.path());
    config.translation.common.max_batch_size = 2;
    let controller = common::controller_with_strategy(Arc::new(MockProvider::translating()), config, BatchStrategy::Payload);
    let sink = RecordingSink::new();
    let mut reporter = ProgressReporter::new("job5", 1, &sink);

    let translated = controller
        .translate_content(&common::ass_document(5), "fr", "five.ass", &mut reporter)
        .await;

    assert_eq!(translated.batches, 3);
    assert_eq!(translated.fallback_batches, 0);
    let processed: Vec<usize> = sink
        .events()
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::FileProgress { file, processed, total, .. } => {
                assert_eq!(file, "five.ass");
                assert_eq!(*total, 3);
                Some(*processed)
            }
            _ => None,
        })
        .collect();
    assert_eq!(processed, vec![1, 2, 3]);
}

/// A failing provider leaves the document byte-identical
#[tokio::test]
async fn test_translate_content_withFailingProvider_shouldReturnOriginal() {
    let workspace = tempfile::tempdir().unwrap();
    let controller = common::controller_with(Arc::new(MockProvider::failing(500)), common::test_config(workspace.path()));
    let mut reporter = ProgressReporter::new("job6", 1, &NullSink);
    let content = common::ass_document(3);

    let translated = controller.translate_content(&content, "fr", "x.ass", &mut reporter).await;

    assert_eq!(translated.text, content);
    assert_eq!(translated.fallback_batches, 1);
}

fn delayed_controller(workspace: &std::path::Path) -> Controller {
    let mut config = common::test_config(workspace);
    config.translation.common.inter_file_delay_ms = 5000;
    common::controller_with(Arc::new(MockProvider::translating()), config)
}

/// The second file of a job waits for the inter-file delay
#[tokio::test(start_paused = true)]
async fn test_run_job_withTwoFiles_shouldWaitBetweenFiles() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let first = common::create_test_file(workspace.path(), "one.ass", &common::ass_document(1))?;
    let second = common::create_test_file(workspace.path(), "two.ass", &common::ass_document(1))?;
    let controller = delayed_controller(workspace.path());
    let files = vec![JobFile::new("one.ass", &first), JobFile::new("two.ass", &second)];

    let started = tokio::time::Instant::now();
    let report = controller.run_job("job7", &files, "fr", workspace.path(), &NullSink).await;

    assert_eq!(report.translated.len(), 2);
    assert!(started.elapsed() >= Duration::from_millis(5000));
    Ok(())
}

/// A single file starts right away
#[tokio::test(start_paused = true)]
async fn test_run_job_withSingleFile_shouldNotWait() -> Result<()> {
    let workspace = common::create_temp_dir()?;
    let input = common::create_test_file(workspace.path(), "one.ass", &common::ass_document(1))?;
    let controller = delayed_controller(workspace.path());

    let started = tokio::time::Instant::now();
    let report = controller
        .run_job("job8", &[JobFile::new("one.ass", &input)], "fr", workspace.path(), &NullSink)
        .await;

    assert_eq!(report.translated.len(), 1);
    assert!(started.elapsed() < Duration::from_millis(5000));
    Ok(())
}
