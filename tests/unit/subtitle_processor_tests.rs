/*!
 * Tests for the line-level subtitle document model
 */

use subtrans::subtitle_processor::{DialogueLine, LineKind, SubtitleDocument};
use subtrans::translation::{BatchStrategy, Batcher};
use crate::common;

/// Parsing and rendering a CRLF document reproduces it byte for byte
#[test]
fn test_render_withCrlfDocument_shouldReproduceInput() {
    let content = common::ass_document(3);
    let document = SubtitleDocument::parse(&content);

    assert_eq!(document.render(), content);
    assert_eq!(document.dialogue_count(), 3);
}

/// Mixed line endings and a missing final newline survive untouched
#[test]
fn test_render_withMixedLineEndings_shouldReproduceInput() {
    let content = "[Script Info]\nTitle: x\r\n\r\n[Events]\nDialogue: 0,a,b,c,d,0,0,0,,Hi";
    let document = SubtitleDocument::parse(content);

    assert_eq!(document.render(), content);
    assert!(document.lines[1].carriage_return);
    assert!(!document.lines[0].carriage_return);
}

/// Only lines starting with the exact marker are dialogue
#[test]
fn test_parse_withLookalikeLines_shouldOnlyClassifyExactMarker() {
    let content = "Dialogue: 0,a\n dialogue: 0,a\ndialogue: 0,a\nComment: 0,a\n";
    let document = SubtitleDocument::parse(content);

    let kinds: Vec<LineKind> = document.lines.iter().map(|line| line.kind).collect();
    assert_eq!(
        kinds,
        vec![LineKind::Dialogue, LineKind::Header, LineKind::Header, LineKind::Header, LineKind::Header]
    );
}

/// The prefix stops right before the first dialogue line
#[test]
fn test_prefix_withHeader_shouldEndBeforeFirstDialogue() {
    let content = common::ass_document(2);
    let document = SubtitleDocument::parse(&content);

    let prefix_lines = common::ASS_HEADER.split("\r\n").count() - 1;
    assert_eq!(document.prefix().len(), prefix_lines);
    assert_eq!(document.first_dialogue_index(), Some(prefix_lines));
}

/// Commas inside the text belong to the payload
#[test]
fn test_dialogue_line_withCommasInText_shouldKeepThemInPayload() {
    let line = "Dialogue: 0,0:00:01.00,0:00:02.00,Default,Bob,0,0,0,,Well, well, well";
    let dialogue = DialogueLine::parse(line);

    assert_eq!(dialogue.payload, Some("Well, well, well"));
    assert_eq!(dialogue.fields, "Dialogue: 0,0:00:01.00,0:00:02.00,Default,Bob,0,0,0,");
    assert_eq!(dialogue.with_payload("Bien"), "Dialogue: 0,0:00:01.00,0:00:02.00,Default,Bob,0,0,0,,Bien");
    assert_eq!(dialogue.to_string(), line);
}

/// An empty payload is still a payload
#[test]
fn test_dialogue_line_withEmptyText_shouldHaveEmptyPayload() {
    let dialogue = DialogueLine::parse("Dialogue: 0,a,b,c,d,0,0,0,,");
    assert_eq!(dialogue.payload, Some(""));
}

/// Batching 120 dialogue lines at 50 per batch gives 50, 50 and 20
#[test]
fn test_batcher_with120Lines_shouldSplitIntoThreeOrderedBatches() {
    let document = SubtitleDocument::parse(&common::ass_document(120));
    let batches = Batcher::new(50, BatchStrategy::WholeLine).split(&document);

    let sizes: Vec<usize> = batches.iter().map(|batch| batch.len()).collect();
    assert_eq!(sizes, vec![50, 50, 20]);

    let indices: Vec<usize> = batches
        .iter()
        .flat_map(|batch| batch.units.iter().map(|unit| unit.line_index))
        .collect();
    assert_eq!(indices, document.dialogue_indices());
}
