/*!
 * Per-transcript pipeline: segmentation, dispatch and assembly.
 *
 * An optional reprocessing pass gives chunks that failed with a retryable
 * error one more dispatch round before the document is assembled.
 */

use log::{info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::app_config::Config;
use crate::errors::PipelineError;
use crate::translation::assembler::Assembler;
use crate::translation::chunk::Chunk;
use crate::translation::client::ChunkTranslator;
use crate::translation::dispatcher::{CancellationSignal, DispatchOptions, DispatchOutcome, Dispatcher};
use crate::translation::document::{Document, Transcript};
use crate::translation::segmenter::Segmenter;

/// Settings for one transcript run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub source_language: String,
    pub target_language: String,
    /// Soft line budget per chunk
    pub chunk_lines: usize,
    pub dispatch: DispatchOptions,
    /// Dispatch retryable failures once more after the first round
    pub reprocess_failed: bool,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            chunk_lines: config.segmentation.chunk_lines,
            dispatch: DispatchOptions::from_config(&config.translation),
            reprocess_failed: config.translation.common.reprocess_failed,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            chunk_lines: 40,
            dispatch: DispatchOptions::default(),
            reprocess_failed: false,
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every chunk translated
    Complete,
    /// Some chunks failed and carry placeholders
    Partial { failed: Vec<usize> },
    /// Stopped early; unfinished chunks are marked abandoned
    Cancelled { completed: usize, total: usize },
}

/// Result of one transcript run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub document: Document,
    pub status: RunStatus,
    pub chunk_count: usize,
    /// Provider calls made across every chunk and pass
    pub total_attempts: u32,
    pub elapsed: Duration,
}

impl PipelineOutcome {
    /// The condition that sets this outcome apart from a clean success, if any
    pub fn error(&self) -> Option<PipelineError> {
        match &self.status {
            RunStatus::Complete => None,
            RunStatus::Partial { failed } => Some(PipelineError::PartialDocument {
                failed: failed.clone(),
                total: self.chunk_count,
            }),
            RunStatus::Cancelled { completed, total } => Some(PipelineError::Cancelled {
                completed: *completed,
                total: *total,
            }),
        }
    }

    pub fn failed_chunks(&self) -> &[usize] {
        match &self.status {
            RunStatus::Partial { failed } => failed,
            _ => &[],
        }
    }

    /// Whether not a single chunk was translated
    pub fn all_failed(&self) -> bool {
        self.chunk_count > 0 && self.failed_chunks().len() == self.chunk_count
    }
}

/// Turns a transcript into a bilingual document
pub struct NotesPipeline {
    segmenter: Segmenter,
    translator: Arc<dyn ChunkTranslator>,
    options: PipelineOptions,
    shared_gate: Option<Arc<Semaphore>>,
}

impl NotesPipeline {
    pub fn new(translator: Arc<dyn ChunkTranslator>, options: PipelineOptions) -> Self {
        Self {
            segmenter: Segmenter::new(options.chunk_lines),
            translator,
            options,
            shared_gate: None,
        }
    }

    pub fn from_config(config: &Config, translator: Arc<dyn ChunkTranslator>) -> Self {
        Self::new(translator, PipelineOptions::from_config(config))
    }

    /// Draw admission permits from a gate shared by several transcripts
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.shared_gate = Some(gate);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    fn dispatcher(&self) -> Dispatcher {
        let dispatcher = Dispatcher::new(Arc::clone(&self.translator), self.options.dispatch);
        match &self.shared_gate {
            Some(gate) => dispatcher.with_gate(Arc::clone(gate)),
            None => dispatcher,
        }
    }

    /// Translate a transcript; `progress` receives (completed, total) chunk counts
    pub async fn run<F>(
        &self,
        transcript: &Transcript,
        title: &str,
        cancel: &CancellationSignal,
        progress: F,
    ) -> Result<PipelineOutcome, PipelineError>
    where
        F: Fn(usize, usize) + Clone + Send + Sync,
    {
        let started = Instant::now();
        let chunks = self.segmenter.segment(transcript.text());
        if chunks.iter().all(Chunk::is_blank) {
            return Err(PipelineError::SegmentationDefect(format!(
                "{} contains no text",
                transcript.source_id()
            )));
        }

        let chunk_count = chunks.len();
        info!(
            "Translating {} ({} chunks) into {}",
            transcript.source_id(),
            chunk_count,
            self.options.target_language
        );

        let dispatcher = self.dispatcher();
        let mut outcome = dispatcher.dispatch(chunks, cancel, progress).await;
        if self.options.reprocess_failed && !outcome.cancelled {
            self.reprocess(&dispatcher, &mut outcome, cancel).await;
        }
        // A stop requested after the last collected result still wins over writing a document
        if cancel.is_cancelled() {
            outcome.cancelled = true;
        }

        let total_attempts = outcome.chunks.iter().map(|chunk| chunk.attempts).sum::<u32>();
        let assembler = Assembler::new(title, transcript.language(), &self.options.target_language);

        let (document, status) = if outcome.cancelled {
            let document = assembler.assemble_cancelled(&outcome.chunks, &outcome.results);
            let status = RunStatus::Cancelled {
                completed: outcome.completed(),
                total: chunk_count,
            };
            (document, status)
        } else {
            let document = assembler.assemble(&outcome.chunks, &outcome.results)?;
            let failed = outcome.failed_indices();
            let status = if failed.is_empty() {
                RunStatus::Complete
            } else {
                warn!(
                    "{}: {} of {} chunks failed",
                    transcript.source_id(),
                    failed.len(),
                    chunk_count
                );
                RunStatus::Partial { failed }
            };
            (document, status)
        };

        Ok(PipelineOutcome {
            document,
            status,
            chunk_count,
            total_attempts,
            elapsed: started.elapsed(),
        })
    }

    /// Second dispatch round for chunks whose final error was retryable
    async fn reprocess(&self, dispatcher: &Dispatcher, outcome: &mut DispatchOutcome, cancel: &CancellationSignal) {
        let retryable: Vec<Chunk> = outcome
            .chunks
            .iter()
            .filter(|chunk| {
                outcome
                    .results
                    .get(&chunk.index())
                    .and_then(|result| result.error())
                    .is_some_and(|error| error.is_retryable())
            })
            .map(|chunk| Chunk::new(chunk.index(), chunk.source()))
            .collect();

        if retryable.is_empty() {
            return;
        }

        info!("Reprocessing {} failed chunks", retryable.len());
        let second = dispatcher.dispatch(retryable, cancel, |_, _| {}).await;
        outcome.cancelled |= second.cancelled;
        let recovered = second.results.values().filter(|result| result.is_success()).count();
        info!("Reprocessing recovered {} chunks", recovered);

        // Chunks the second round did not finish keep their first-round failure
        for chunk in second.chunks {
            if !second.results.contains_key(&chunk.index()) {
                continue;
            }
            if let Some(slot) = outcome.chunks.iter_mut().find(|c| c.index() == chunk.index()) {
                let earlier_attempts = slot.attempts;
                *slot = chunk;
                slot.attempts += earlier_attempts;
            }
        }
        outcome.results.extend(second.results);
    }
}
