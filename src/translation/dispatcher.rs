/*!
 * Bounded-concurrency dispatch of chunks to a translator.
 *
 * Every chunk becomes one unit of work. Units are created in index order and
 * wait on a FIFO semaphore, so the lowest pending index is admitted as soon as
 * a permit frees. A unit keeps its permit through all attempts and backoff
 * sleeps. Only the collector loop writes the result map; each unit writes only
 * its own slot on the status board.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};

use crate::app_config::TranslationConfig;
use crate::errors::TranslationError;
use crate::translation::chunk::{Chunk, ChunkResult, ChunkStatus};
use crate::translation::client::ChunkTranslator;
use crate::translation::retry::RetryPolicy;

/// Cloneable cancellation flag shared between a run and whoever may stop it
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation; every clone observes it
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as `self`, so this cannot resolve
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch settings
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Permits of the admission gate
    pub max_concurrent_requests: usize,
    pub retry: RetryPolicy,
    /// Wall-clock limit for the whole dispatch
    pub run_timeout: Option<Duration>,
}

impl DispatchOptions {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_concurrent_requests: config.optimal_concurrent_requests(),
            retry: config.retry_policy(),
            run_timeout: config.run_timeout(),
        }
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            retry: RetryPolicy::default(),
            run_timeout: None,
        }
    }
}

/// Everything a dispatch produced
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The dispatched chunks with status, target and attempts filled in
    pub chunks: Vec<Chunk>,
    /// Terminal results keyed by chunk index
    pub results: BTreeMap<usize, ChunkResult>,
    /// Set when the run was cancelled or timed out before every chunk finished
    pub cancelled: bool,
}

impl DispatchOutcome {
    pub fn total(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks with a terminal result
    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.results.len() == self.chunks.len()
    }

    /// Indices of chunks whose terminal result is a failure, ascending
    pub fn failed_indices(&self) -> Vec<usize> {
        self.results
            .values()
            .filter(|result| !result.is_success())
            .map(|result| result.index)
            .collect()
    }
}

/// One status-board entry, owned by a single unit
#[derive(Debug, Default)]
struct ChunkSlot {
    status: AtomicU8,
    attempts: AtomicU32,
}

impl ChunkSlot {
    fn set_status(&self, status: ChunkStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }

    fn status(&self) -> ChunkStatus {
        ChunkStatus::from_u8(self.status.load(Ordering::SeqCst))
    }
}

/// Runs chunks through a translator with bounded concurrency and per-chunk retry
pub struct Dispatcher {
    translator: Arc<dyn ChunkTranslator>,
    options: DispatchOptions,
    gate: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(translator: Arc<dyn ChunkTranslator>, options: DispatchOptions) -> Self {
        let permits = options.max_concurrent_requests.max(1);
        Self {
            translator,
            options,
            gate: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Use an admission gate shared with other dispatchers
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = gate;
        self
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Translate every chunk; `progress` receives (completed, total) after each terminal result
    pub async fn dispatch<F>(&self, chunks: Vec<Chunk>, cancel: &CancellationSignal, progress: F) -> DispatchOutcome
    where
        F: Fn(usize, usize) + Clone + Send + Sync,
    {
        let total = chunks.len();
        let limit = self.options.max_concurrent_requests.max(1);
        let retry = self.options.retry;
        let board: Arc<[ChunkSlot]> = (0..total).map(|_| ChunkSlot::default()).collect();
        let completed = Arc::new(AtomicUsize::new(0));

        info!(
            "Dispatching {} chunks with up to {} concurrent requests ({} attempts per chunk)",
            total,
            limit,
            retry.max_attempts()
        );

        let work: Vec<(usize, usize, String, bool)> = chunks
            .iter()
            .enumerate()
            .map(|(position, chunk)| (position, chunk.index(), chunk.source().to_string(), chunk.is_blank()))
            .collect();

        let units = stream::iter(work)
            .map(|(position, index, source, blank)| {
                let translator = Arc::clone(&self.translator);
                let gate = Arc::clone(&self.gate);
                let board = Arc::clone(&board);
                let completed = Arc::clone(&completed);
                let progress = progress.clone();

                async move {
                    let started = Instant::now();
                    let slot = &board[position];

                    let (outcome, attempt) = if blank {
                        // Nothing to translate
                        (Ok(String::new()), 0)
                    } else {
                        match gate.acquire_owned().await {
                            Ok(_permit) => {
                                slot.set_status(ChunkStatus::InFlight);
                                run_with_retry(translator.as_ref(), &source, index, &retry, slot).await
                            }
                            Err(_) => (
                                Err(TranslationError::Permanent("Admission gate closed".to_string())),
                                0,
                            ),
                        }
                    };

                    slot.set_status(if outcome.is_ok() {
                        ChunkStatus::Succeeded
                    } else {
                        ChunkStatus::Failed
                    });
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress(done, total);

                    ChunkResult {
                        index,
                        outcome,
                        attempt,
                        elapsed: started.elapsed(),
                    }
                }
            })
            .buffer_unordered(limit);
        tokio::pin!(units);

        let deadline = self.options.run_timeout;
        let run_deadline = async move {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(run_deadline);
        let cancellation = cancel.cancelled();
        tokio::pin!(cancellation);

        let mut results = BTreeMap::new();
        let mut cancelled = false;

        loop {
            tokio::select! {
                biased;
                _ = &mut cancellation => {
                    warn!("Dispatch cancelled with {} of {} chunks finished", results.len(), total);
                    cancelled = true;
                    break;
                }
                _ = &mut run_deadline => {
                    warn!("Run timeout reached with {} of {} chunks finished", results.len(), total);
                    cancelled = true;
                    break;
                }
                next = units.next() => match next {
                    Some(result) => {
                        results.insert(result.index, result);
                    }
                    None => break,
                }
            }
        }

        let mut chunks = chunks;
        for (position, chunk) in chunks.iter_mut().enumerate() {
            match results.get(&chunk.index()) {
                Some(result) => {
                    chunk.attempts = result.attempt;
                    chunk.status = if result.is_success() {
                        ChunkStatus::Succeeded
                    } else {
                        ChunkStatus::Failed
                    };
                    chunk.target = result.outcome.as_ref().ok().cloned();
                }
                None => {
                    // Finished units that were never collected count as abandoned
                    let slot = &board[position];
                    chunk.attempts = slot.attempts.load(Ordering::SeqCst);
                    chunk.status = match slot.status() {
                        ChunkStatus::Pending => ChunkStatus::Pending,
                        _ => ChunkStatus::InFlight,
                    };
                }
            }
        }

        DispatchOutcome {
            chunks,
            results,
            cancelled,
        }
    }
}

/// Attempt loop of a single unit; returns the outcome and the number of its final attempt
async fn run_with_retry(
    translator: &dyn ChunkTranslator,
    source: &str,
    index: usize,
    retry: &RetryPolicy,
    slot: &ChunkSlot,
) -> (Result<String, TranslationError>, u32) {
    let mut attempt = 0;
    loop {
        attempt += 1;
        slot.attempts.store(attempt, Ordering::SeqCst);
        debug!("Chunk {} attempt {}/{}", index + 1, attempt, retry.max_attempts());

        match translator.translate(source).await {
            Ok(text) => {
                debug!("Chunk {} translated on attempt {}", index + 1, attempt);
                return (Ok(text), attempt);
            }
            Err(e) if e.is_retryable() && retry.allows_retry_after(attempt) => {
                let delay = retry.delay_for_attempt(attempt);
                warn!(
                    "Chunk {} attempt {} failed ({}), retrying in {:?}",
                    index + 1,
                    attempt,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!("Chunk {} failed after {} attempt(s): {}", index + 1, attempt, e);
                return (Err(e), attempt);
            }
        }
    }
}
