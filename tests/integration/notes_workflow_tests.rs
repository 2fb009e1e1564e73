/*!
 * End-to-end tests from transcript text to rendered notes
 */

use std::time::Duration;

use subnotes::errors::{PipelineError, ProviderError};
use subnotes::providers::mock::MockProvider;
use subnotes::translation::document::{ABANDONED_TRANSLATION_PLACEHOLDER, FAILED_TRANSLATION_PLACEHOLDER};
use subnotes::translation::{
    CancellationSignal, NotesPipeline, PipelineOptions, RenderOptions, RunStatus, SectionOutcome, Transcript,
};
use crate::common;

fn pipeline(provider: MockProvider, chunk_lines: usize, max_concurrent_requests: usize) -> NotesPipeline {
    let options = PipelineOptions {
        chunk_lines,
        dispatch: common::fast_dispatch(max_concurrent_requests, 3),
        ..PipelineOptions::default()
    };
    NotesPipeline::new(common::mock_translator(provider), options)
}

/// Three paragraphs fit one chunk and come back as three pairs
#[tokio::test]
async fn test_run_withThreeParagraphs_shouldPairEachParagraph() {
    let transcript = Transcript::new("lecture.txt", common::sample_transcript(3));
    let outcome = pipeline(MockProvider::working(), 40, 2)
        .run(&transcript, "Lecture1_Notes", &CancellationSignal::new(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    assert_eq!(outcome.chunk_count, 1);
    let pairs: Vec<_> = outcome.document.pairs().collect();
    assert_eq!(pairs.len(), 3);
    for (n, pair) in pairs.iter().enumerate() {
        let source = format!("This is paragraph {} of the lecture, and it ends here.", n + 1);
        assert_eq!(pair.source, source);
        assert_eq!(pair.translated, format!("[TRANSLATED] {}", source));
    }

    let rendered = outcome.document.render(&RenderOptions::default());
    assert!(rendered.starts_with("# Lecture1_Notes\n"));
    let first = rendered.find("paragraph 1 of the lecture").unwrap();
    let translated = rendered.find("[TRANSLATED] This is paragraph 1").unwrap();
    let second = rendered.find("\nThis is paragraph 2").unwrap();
    assert!(first < translated && translated < second);
}

/// A chunk that keeps failing leaves a placeholder and the rest of the notes intact
#[tokio::test]
async fn test_run_withOneRejectedChunk_shouldProducePartialDocument() {
    common::init_test_logging();
    let provider = MockProvider::working().with_failure_rule(|request| {
        request
            .text
            .contains("number 3.")
            .then(|| ProviderError::from_status(400, "rejected"))
    });
    let transcript = Transcript::new("talk.txt", common::one_line_paragraphs(5));

    let outcome = pipeline(provider.clone(), 1, 3)
        .run(&transcript, "Talk", &CancellationSignal::new(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(outcome.document.sections.len(), 5);
    assert_eq!(outcome.failed_chunks(), &[2]);
    assert_eq!(outcome.error(), Some(PipelineError::PartialDocument { failed: vec![2], total: 5 }));
    assert_eq!(provider.request_count(), 5);

    let failed = &outcome.document.sections[2];
    assert!(matches!(&failed.outcome, SectionOutcome::Failed { error } if error.contains("rejected")));
    assert_eq!(failed.pairs[0].source, "Sentence number 3.");
    assert_eq!(failed.pairs[0].translated, FAILED_TRANSLATION_PLACEHOLDER);
    for index in [0, 1, 3, 4] {
        assert!(outcome.document.sections[index].is_translated());
    }
}

#[tokio::test]
async fn test_run_withCancellation_shouldMarkUnfinishedSectionsAbandoned() {
    let cancel = CancellationSignal::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    let transcript = Transcript::new("long.txt", common::one_line_paragraphs(12));

    let outcome = pipeline(MockProvider::slow(30), 1, 1)
        .run(&transcript, "Long", &cancel, |_, _| {})
        .await
        .unwrap();

    match outcome.status {
        RunStatus::Cancelled { completed, total } => {
            assert_eq!(total, 12);
            assert!(completed < 12);
        }
        other => panic!("expected a cancelled run, got {:?}", other),
    }
    assert_eq!(outcome.document.sections.len(), 12);
    let last = &outcome.document.sections[11];
    assert_eq!(last.outcome, SectionOutcome::Abandoned);
    assert_eq!(last.pairs[0].translated, ABANDONED_TRANSLATION_PLACEHOLDER);
}

/// Blank lines between chunks survive as empty sections
#[tokio::test]
async fn test_run_withBlankParagraphs_shouldKeepSectionsAligned() {
    let transcript = Transcript::new("gaps.txt", "First.\n\n\n\nSecond.\n");
    let outcome = pipeline(MockProvider::working(), 1, 2)
        .run(&transcript, "Gaps", &CancellationSignal::new(), |_, _| {})
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Complete);
    let indices: Vec<usize> = outcome.document.sections.iter().map(|s| s.chunk_index).collect();
    assert_eq!(indices, (0..outcome.chunk_count).collect::<Vec<_>>());
    assert_eq!(outcome.document.pairs().count(), 2);
}

#[tokio::test]
async fn test_render_withFrontMatter_shouldEmitHeader() {
    let transcript = Transcript::new("a.txt", "Hello there.\n");
    let outcome = pipeline(MockProvider::working(), 40, 1)
        .run(&transcript, "Lecture \"Zero\"", &CancellationSignal::new(), |_, _| {})
        .await
        .unwrap();

    let rendered = outcome.document.render(&RenderOptions {
        front_matter: true,
        title: None,
    });

    assert!(rendered.starts_with("---\ntitle: \"Lecture \\\"Zero\\\"\"\npublishDate: "));
    assert!(rendered.contains("language: zh\n---\n\n# Lecture \"Zero\"\n"));
    assert!(rendered.ends_with("\nHello there.\n\n[TRANSLATED] Hello there.\n"));
}
