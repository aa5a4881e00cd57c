/*!
 * Tests for the translation client: retries, fallbacks and line merging
 */

use std::sync::Arc;
use std::sync::atomic::Ordering;

use subtrans::providers::mock::{MockProvider, TRANSLATED_MARKER};
use subtrans::providers::ProviderReply;
use subtrans::subtitle_processor::SubtitleDocument;
use subtrans::translation::{
    Batch, BatchOutcome, BatchStrategy, BatchTranslator, BatchUnit, Batcher, RetryPolicy, TranslationService, SENTINEL,
};
use crate::common::mock_providers::{FieldRewritingProvider, LineDroppingProvider};
use crate::common;

fn service(provider: Arc<dyn subtrans::providers::Provider>, strategy: BatchStrategy) -> TranslationService {
    TranslationService::new(provider, RetryPolicy::from_millis(3, 1), strategy)
}

fn whole_line_batch(texts: &[&str]) -> Batch {
    Batch {
        index: 0,
        units: texts
            .iter()
            .enumerate()
            .map(|(index, text)| BatchUnit {
                line_index: index,
                source: common::dialogue_line(index, text).trim_end().to_string(),
            })
            .collect(),
    }
}

fn payload_batch(texts: &[&str]) -> Batch {
    Batch {
        index: 0,
        units: texts
            .iter()
            .enumerate()
            .map(|(index, text)| BatchUnit {
                line_index: index,
                source: text.to_string(),
            })
            .collect(),
    }
}

/// Two rate limits followed by a good answer still translate the batch
#[tokio::test]
async fn test_translate_batch_withTwoRateLimits_shouldSucceedOnThirdAttempt() {
    let mock = MockProvider::scripted(vec![ProviderReply::status(429), ProviderReply::status(429)]);
    let service = service(Arc::new(mock.clone()), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello", "World"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::Translated);
    assert_eq!(mock.request_count(), 3);
    assert!(result.units[0].ends_with(&format!(",{}Hello", TRANSLATED_MARKER)));
    assert!(result.units[1].ends_with(&format!(",{}World", TRANSLATED_MARKER)));
}

/// A provider that keeps failing exhausts the attempts and keeps the source
#[tokio::test]
async fn test_translate_batch_withPersistentFailure_shouldFallBackAfterAllAttempts() {
    let mock = MockProvider::failing(503);
    let service = service(Arc::new(mock.clone()), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::FallbackExhausted);
    assert_eq!(mock.request_count(), 3);
    assert_eq!(result.units, vec![batch.units[0].source.clone()]);
}

/// Network errors are retried like error statuses
#[tokio::test]
async fn test_translate_batch_withDisconnectedProvider_shouldFallBack() {
    let mock = MockProvider::disconnected();
    let service = service(Arc::new(mock.clone()), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::FallbackExhausted);
    assert_eq!(mock.request_count(), 3);
}

/// A success reply without text is not retried
#[tokio::test]
async fn test_translate_batch_withEmptySuccessReply_shouldGiveUpImmediately() {
    let mock = MockProvider::scripted(vec![ProviderReply { status: 200, text: None }]);
    let service = service(Arc::new(mock.clone()), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::FallbackMalformed);
    assert_eq!(mock.request_count(), 1);
    assert_eq!(result.units[0], batch.units[0].source);
}

/// One missing line in the answer discards the whole batch
#[tokio::test]
async fn test_translate_batch_withMissingLine_shouldKeepWholeBatchOriginal() {
    let provider = Arc::new(LineDroppingProvider::default());
    let service = service(provider.clone(), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["One", "Two", "Three"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::FallbackLineMismatch);
    assert_eq!(result.units, batch.sources());
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

/// Whole-line answers only contribute their text; the original fields stay
#[tokio::test]
async fn test_translate_batch_withRewrittenFields_shouldKeepOriginalFields() {
    let service = service(Arc::new(FieldRewritingProvider), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello, there"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::Translated);
    assert_eq!(
        result.units[0],
        "Dialogue: 0,0:00:00.00,0:00:00.50,Default,,0,0,0,,Hello, there (fr)"
    );
}

/// An answer that lost the dialogue marker is a mismatch
#[tokio::test]
async fn test_translate_batch_withoutDialogueMarker_shouldFallBack() {
    let service = service(Arc::new(MockProvider::fixed("Bonjour")), BatchStrategy::WholeLine);
    let batch = whole_line_batch(&["Hello"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::FallbackLineMismatch);
}

/// Line-break escapes travel as sentinels and come back as `\n`
#[tokio::test]
async fn test_translate_batch_withLineBreakEscapes_shouldProtectAndNormalize() {
    let mock = MockProvider::echo();
    let service = service(Arc::new(mock.clone()), BatchStrategy::Payload);
    let batch = payload_batch(&["First\\NSecond", "A\\\\NB"]);

    let result = service.translate_batch(&batch, "fr").await;

    let prompt = &mock.prompts()[0];
    assert!(prompt.contains(&format!("First{}Second", SENTINEL)));
    assert!(!prompt.contains("\\N"));
    assert_eq!(result.units, vec!["First\\nSecond", "A\\nB"]);
}

/// Blank units keep their text and are left out of the prompt
#[tokio::test]
async fn test_translate_batch_withBlankUnit_shouldNotSubmitIt() {
    let mock = MockProvider::translating();
    let service = service(Arc::new(mock.clone()), BatchStrategy::Payload);
    let batch = payload_batch(&["Hello", "  ", "World"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::Translated);
    assert_eq!(MockProvider::units_of(&mock.prompts()[0]), vec!["Hello", "World"]);
    assert_eq!(
        result.units,
        vec![
            format!("{}Hello", TRANSLATED_MARKER),
            "  ".to_string(),
            format!("{}World", TRANSLATED_MARKER),
        ]
    );
}

/// A batch of blank units never reaches the provider
#[tokio::test]
async fn test_translate_batch_withOnlyBlankUnits_shouldSkipRequest() {
    let mock = MockProvider::translating();
    let service = service(Arc::new(mock.clone()), BatchStrategy::Payload);
    let batch = payload_batch(&["", " "]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.outcome, BatchOutcome::Translated);
    assert_eq!(result.units, vec!["", " "]);
    assert_eq!(mock.request_count(), 0);
}

/// Code fences around the answer are removed
#[tokio::test]
async fn test_translate_batch_withCodeFence_shouldUnwrapAnswer() {
    let service = service(Arc::new(MockProvider::fixed("```\nBonjour\n```")), BatchStrategy::Payload);
    let batch = payload_batch(&["Hello"]);

    let result = service.translate_batch(&batch, "fr").await;

    assert_eq!(result.units, vec!["Bonjour"]);
}

/// The prompt names the target language rather than its code
#[tokio::test]
async fn test_translate_batch_shouldNameTargetLanguageInPrompt() {
    let mock = MockProvider::echo();
    let service = service(Arc::new(mock.clone()), BatchStrategy::Payload);

    service.translate_batch(&payload_batch(&["Hello"]), "fr").await;

    assert!(mock.prompts()[0].contains("to French."));
}

/// translate_text returns the input when the provider fails
#[tokio::test]
async fn test_translate_text_withFailingProvider_shouldReturnInput() {
    let service = service(Arc::new(MockProvider::failing(500)), BatchStrategy::Payload);

    assert_eq!(service.translate_text("Hello\\Nthere", "fr").await, "Hello\\Nthere");
    assert_eq!(service.translate_text("   ", "fr").await, "   ");
}

/// translate_text returns the cleaned answer
#[test]
fn test_translate_text_withAnswer_shouldRestoreLineBreaks() {
    let service = service(Arc::new(MockProvider::echo()), BatchStrategy::Payload);

    let translated = tokio_test::block_on(service.translate_text("Hello\\Nthere", "fr"));

    assert_eq!(translated, "Hello\\nthere");
}

/// Batches run in order and every one of them reports progress
#[tokio::test]
async fn test_translate_batches_shouldReportProgressAfterEveryBatch() {
    let mock = MockProvider::translating();
    let document = SubtitleDocument::parse(&common::ass_document(7));
    let batches = Batcher::new(3, BatchStrategy::WholeLine).split(&document);
    let translator = BatchTranslator::new(service(Arc::new(mock.clone()), BatchStrategy::WholeLine));

    let mut reported = Vec::new();
    let results = translator
        .translate_batches(&batches, "fr", |processed, total| reported.push((processed, total)))
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(reported, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(mock.request_count(), 3);
    let prompts = mock.prompts();
    let first_units = MockProvider::units_of(&prompts[0]);
    assert!(first_units[0].ends_with("Line number 1"));
}
