/*!
 * Tests for the concurrent chunk dispatcher
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use subnotes::errors::TranslationError;
use subnotes::providers::mock::{MockProvider, MockRequest};
use subnotes::translation::{CancellationSignal, Chunk, ChunkStatus, Dispatcher, Segmenter};
use crate::common;

fn chunks(count: usize) -> Vec<Chunk> {
    Segmenter::new(1).segment(&common::one_line_paragraphs(count))
}

/// Number embedded in "Sentence number N."
fn sentence_number(request: &MockRequest) -> u64 {
    request
        .text
        .trim()
        .trim_start_matches("Sentence number ")
        .trim_end_matches('.')
        .parse()
        .unwrap_or(0)
}

/// A transient failure is retried until the attempt budget is spent
#[tokio::test]
async fn test_dispatch_withTransientFailure_shouldMakeExactlyMaxAttempts() {
    let provider = MockProvider::failing(503);
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(2, 3));

    let outcome = dispatcher.dispatch(chunks(1), &CancellationSignal::new(), |_, _| {}).await;

    assert_eq!(provider.request_count(), 3);
    assert_eq!(outcome.chunks[0].attempts, 3);
    assert_eq!(outcome.chunks[0].status, ChunkStatus::Failed);
    let result = &outcome.results[&0];
    assert_eq!(result.attempt, 3);
    match result.error() {
        Some(TranslationError::Transient(message)) => assert!(message.contains("503")),
        other => panic!("expected a transient error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_dispatch_withPermanentFailure_shouldNotRetry() {
    let provider = MockProvider::failing(400);
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(2, 5));

    let outcome = dispatcher.dispatch(chunks(1), &CancellationSignal::new(), |_, _| {}).await;

    assert_eq!(provider.request_count(), 1);
    assert!(matches!(outcome.results[&0].error(), Some(TranslationError::Permanent(_))));
    assert_eq!(outcome.failed_indices(), vec![0]);
}

#[tokio::test]
async fn test_dispatch_withIntermittentFailures_shouldRecoverEveryChunk() {
    let provider = MockProvider::intermittent(2);
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(1, 3));

    let outcome = dispatcher.dispatch(chunks(6), &CancellationSignal::new(), |_, _| {}).await;

    assert!(outcome.is_complete());
    assert!(outcome.failed_indices().is_empty());
    assert!(provider.request_count() > 6);
}

/// The admission gate bounds simultaneous provider calls
#[tokio::test]
async fn test_dispatch_withSlowProvider_shouldNeverExceedConcurrencyLimit() {
    let provider = MockProvider::slow(15);
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(3, 1));

    let outcome = dispatcher.dispatch(chunks(12), &CancellationSignal::new(), |_, _| {}).await;

    assert!(outcome.is_complete());
    assert_eq!(provider.request_count(), 12);
    assert!(provider.peak_in_flight() <= 3, "peak was {}", provider.peak_in_flight());
    assert!(provider.peak_in_flight() > 1);
}

/// Later chunks finishing first does not disturb index order
#[tokio::test]
async fn test_dispatch_withReversedLatencies_shouldKeepIndexOrder() {
    let provider = MockProvider::working().with_delay(|request| (10 - sentence_number(request).min(10)) * 4);
    let dispatcher = Dispatcher::new(common::mock_translator(provider), common::fast_dispatch(10, 1));

    let outcome = dispatcher.dispatch(chunks(10), &CancellationSignal::new(), |_, _| {}).await;

    let keys: Vec<usize> = outcome.results.keys().copied().collect();
    assert_eq!(keys, (0..10).collect::<Vec<_>>());
    for chunk in &outcome.chunks {
        let expected = format!("[TRANSLATED] Sentence number {}.", chunk.index() + 1);
        assert_eq!(chunk.target.as_deref(), Some(expected.as_str()));
    }
}

#[tokio::test]
async fn test_dispatch_withBlankChunk_shouldCompleteWithoutCallingProvider() {
    let provider = MockProvider::working();
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(2, 3));

    let outcome = dispatcher
        .dispatch(vec![Chunk::new(0, "\n  \n")], &CancellationSignal::new(), |_, _| {})
        .await;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(outcome.results[&0].outcome, Ok(String::new()));
    assert_eq!(outcome.results[&0].attempt, 0);
}

#[tokio::test]
async fn test_dispatch_shouldReportProgressUpToTotal() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let dispatcher = Dispatcher::new(common::mock_translator(MockProvider::working()), common::fast_dispatch(4, 1));

    dispatcher
        .dispatch(chunks(5), &CancellationSignal::new(), move |done, total| recorder.lock().push((done, total)))
        .await;

    let seen = seen.lock().clone();
    assert_eq!(seen.len(), 5);
    assert_eq!(seen.last(), Some(&(5, 5)));
    assert!(seen.windows(2).all(|pair| pair[0].0 < pair[1].0));
}

/// Cancelling mid-run keeps finished chunks and leaves the rest unfinished
#[tokio::test]
async fn test_dispatch_withCancellation_shouldStopEarly() {
    let provider = MockProvider::slow(40);
    let dispatcher = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(2, 1));
    let cancel = CancellationSignal::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        trigger.cancel();
    });

    let outcome = dispatcher.dispatch(chunks(10), &cancel, |_, _| {}).await;

    assert!(outcome.cancelled);
    assert!(outcome.completed() < 10);
    assert!(provider.request_count() < 10);
    let unfinished = outcome
        .chunks
        .iter()
        .filter(|chunk| matches!(chunk.status, ChunkStatus::Pending | ChunkStatus::InFlight))
        .count();
    assert_eq!(unfinished, 10 - outcome.completed());
}

#[tokio::test]
async fn test_dispatch_withRunTimeout_shouldEndAsCancelled() {
    let provider = MockProvider::slow(40);
    let mut options = common::fast_dispatch(1, 1);
    options.run_timeout = Some(Duration::from_millis(100));
    let dispatcher = Dispatcher::new(common::mock_translator(provider), options);

    let outcome = dispatcher.dispatch(chunks(10), &CancellationSignal::new(), |_, _| {}).await;

    assert!(outcome.cancelled);
    assert!(outcome.completed() < 10);
}

/// Two dispatchers drawing from one gate share its permits
#[tokio::test]
async fn test_dispatch_withSharedGate_shouldBoundCallsAcrossDispatchers() {
    let provider = MockProvider::slow(10);
    let gate = Arc::new(Semaphore::new(2));
    let first = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(4, 1))
        .with_gate(Arc::clone(&gate));
    let second = Dispatcher::new(common::mock_translator(provider.clone()), common::fast_dispatch(4, 1))
        .with_gate(gate);
    let cancel = CancellationSignal::new();

    let (a, b) = tokio::join!(
        first.dispatch(chunks(6), &cancel, |_, _| {}),
        second.dispatch(chunks(6), &cancel, |_, _| {})
    );

    assert!(a.is_complete() && b.is_complete());
    assert!(provider.peak_in_flight() <= 2);
}
