/*!
 * Batch processing of transcript files.
 *
 * Every file runs through the same pipeline. Files are processed with their
 * own concurrency limit, separate from the per-file chunk gate, and their
 * reports are appended in input order. A failing file never stops the batch.
 */

use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::app_config::Config;
use crate::errors::{AppError, PipelineError};
use crate::file_utils::FileManager;
use crate::report::{BatchReport, FileReport, FileStatus};
use crate::translation::dispatcher::CancellationSignal;
use crate::translation::document::{RenderOptions, SectionOutcome, Transcript};
use crate::translation::pipeline::{NotesPipeline, PipelineOutcome, RunStatus};

/// Name of the per-run issue log inside the output directory
pub const ISSUES_LOG_FILE: &str = "subnotes.issues.log";

/// Batch settings
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Files processed at the same time
    pub concurrent_files: usize,
    /// Translate again even when the output document exists
    pub force_overwrite: bool,
    pub render: RenderOptions,
    /// Admission gate pooled across all files instead of one per file
    pub shared_gate: Option<Arc<Semaphore>>,
}

impl BatchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            concurrent_files: 1,
            force_overwrite: false,
            render: RenderOptions::default(),
            shared_gate: None,
        }
    }

    pub fn from_config(config: &Config, output_dir: impl Into<PathBuf>, force_overwrite: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            concurrent_files: config.batch.concurrent_files.max(1),
            force_overwrite,
            render: RenderOptions {
                front_matter: config.batch.front_matter,
                title: None,
            },
            shared_gate: None,
        }
    }
}

/// Receives progress events while a batch runs
pub trait BatchObserver: Send + Sync {
    fn file_started(&self, _input: &Path, _position: usize, _total: usize) {}

    /// Chunk progress of one file
    fn chunk_progress(&self, _input: &Path, _completed: usize, _total: usize) {}

    fn file_finished(&self, _report: &FileReport) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Applies the pipeline to a set of files
pub struct BatchCoordinator {
    pipeline: NotesPipeline,
    options: BatchOptions,
}

impl BatchCoordinator {
    pub fn new(pipeline: NotesPipeline, options: BatchOptions) -> Self {
        let pipeline = match &options.shared_gate {
            Some(gate) => pipeline.with_gate(Arc::clone(gate)),
            None => pipeline,
        };
        Self { pipeline, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Output document path for an input file
    pub fn output_path(&self, input: &Path) -> PathBuf {
        FileManager::generate_output_path(input, &self.options.output_dir)
    }

    /// Process every file; the report lists them in input order
    pub async fn run(&self, files: &[PathBuf], cancel: &CancellationSignal, observer: &dyn BatchObserver) -> BatchReport {
        let total = files.len();
        let mut report = BatchReport::new();
        info!(
            "Processing {} files into {:?} ({} at a time)",
            total,
            self.options.output_dir,
            self.options.concurrent_files.max(1)
        );

        let mut entries = stream::iter(files.iter().enumerate())
            .map(|(position, input)| self.process_file(input, position, total, cancel, observer))
            .buffered(self.options.concurrent_files.max(1));

        while let Some(entry) = entries.next().await {
            report.push(entry);
        }

        report
    }

    async fn process_file(
        &self,
        input: &Path,
        position: usize,
        total: usize,
        cancel: &CancellationSignal,
        observer: &dyn BatchObserver,
    ) -> FileReport {
        let started = Instant::now();
        let output = self.output_path(input);

        let mut entry = if cancel.is_cancelled() {
            FileReport::new(input, FileStatus::Cancelled).with_error("Batch cancelled before this file started")
        } else if !self.options.force_overwrite && FileManager::file_exists(&output) {
            info!("Skipping {:?}: {:?} already exists", input, output);
            FileReport::new(input, FileStatus::Skipped).with_output(&output)
        } else {
            observer.file_started(input, position, total);
            self.translate_file(input, &output, cancel, observer).await
        };

        entry.elapsed_secs = started.elapsed().as_secs_f64();
        observer.file_finished(&entry);
        entry
    }

    async fn translate_file(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationSignal,
        observer: &dyn BatchObserver,
    ) -> FileReport {
        let text = match FileManager::read_transcript(input) {
            Ok(text) => text,
            Err(e) => return Self::failed(input, format!("{:#}", e)),
        };

        let transcript = Transcript::with_language(
            input.display().to_string(),
            text,
            self.pipeline.options().source_language.clone(),
        );
        let title = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let progress = |completed: usize, chunks: usize| observer.chunk_progress(input, completed, chunks);

        match self.pipeline.run(&transcript, &title, cancel, progress).await {
            Ok(outcome) => self.finish_file(input, output, outcome),
            Err(PipelineError::SegmentationDefect(message)) => {
                warn!("Skipping {:?}: {}", input, message);
                FileReport::new(input, FileStatus::Skipped).with_error(message)
            }
            Err(e) => Self::failed(input, e.to_string()),
        }
    }

    fn finish_file(&self, input: &Path, output: &Path, outcome: PipelineOutcome) -> FileReport {
        let status = match &outcome.status {
            RunStatus::Complete => FileStatus::Processed,
            RunStatus::Partial { .. } if outcome.all_failed() => FileStatus::Failed,
            RunStatus::Partial { .. } => FileStatus::Partial,
            RunStatus::Cancelled { .. } => FileStatus::Cancelled,
        };

        let mut entry = FileReport::new(input, status);
        entry.chunk_count = outcome.chunk_count;
        entry.failed_chunks = outcome.failed_chunks().to_vec();
        entry.error = outcome.error().map(|e| e.to_string());

        // A cancelled document would make the next run skip this file
        if status == FileStatus::Cancelled {
            return entry;
        }

        self.log_failed_sections(input, &outcome);

        let rendered = outcome.document.render(&self.options.render);
        match FileManager::write_to_file(output, &rendered) {
            Ok(()) => {
                info!("Wrote {:?} ({})", output, status);
                entry.with_output(output)
            }
            Err(e) => {
                let failure = AppError::BatchFile {
                    path: input.to_path_buf(),
                    message: format!("{:#}", e),
                };
                error!("{}", failure);
                entry.status = FileStatus::Failed;
                entry.with_error(failure.to_string())
            }
        }
    }

    fn failed(input: &Path, message: String) -> FileReport {
        let failure = AppError::BatchFile {
            path: input.to_path_buf(),
            message,
        };
        error!("{}", failure);
        FileReport::new(input, FileStatus::Failed).with_error(failure.to_string())
    }

    /// Append failed chunks to the issue log next to the documents
    fn log_failed_sections(&self, input: &Path, outcome: &PipelineOutcome) {
        let log_path = self.options.output_dir.join(ISSUES_LOG_FILE);
        for section in &outcome.document.sections {
            if let SectionOutcome::Failed { error } = &section.outcome {
                let line = format!("{}: chunk {} failed: {}", input.display(), section.chunk_index + 1, error);
                if let Err(e) = FileManager::append_to_log_file(&log_path, &line) {
                    warn!("Could not write issue log {:?}: {}", log_path, e);
                }
            }
        }
    }
}
