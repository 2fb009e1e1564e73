use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::report::{BatchReport, FileReport, FileStatus};
use crate::translation::batch::{BatchCoordinator, BatchObserver, BatchOptions, ISSUES_LOG_FILE};
use crate::translation::client::{ChunkTranslator, TranslationService};
use crate::translation::dispatcher::CancellationSignal;
use crate::translation::pipeline::NotesPipeline;

// @module: Application controller for transcript processing

/// Default output folder name, created next to the input folder
const DEFAULT_OUTPUT_FOLDER: &str = "processed";

/// Main application controller for study-note generation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translator shared by every file of a run
    translator: Arc<dyn ChunkTranslator>,
    // @field: Stops the current run when triggered
    cancel: CancellationSignal,
}

impl Controller {
    // @method: Create a controller whose translator is built from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translator = TranslationService::from_config(&config)?;
        Ok(Self::with_translator(config, translator))
    }

    /// Create a controller around an existing translator
    pub fn with_translator(config: Config, translator: Arc<dyn ChunkTranslator>) -> Self {
        Self {
            config,
            translator,
            cancel: CancellationSignal::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signal that cancels the run in progress
    pub fn cancellation(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    /// Verify that the configured provider answers
    pub async fn check(&self) -> Result<()> {
        info!(
            "Checking {} ({})",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model()
        );
        self.translator
            .check()
            .await
            .with_context(|| format!("{} is not reachable", self.config.translation.provider.display_name()))?;
        info!("Provider connection OK");
        Ok(())
    }

    /// Translate a single transcript into `output_dir`
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<BatchReport> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        self.process(vec![input_file], &output_dir, force_overwrite, false).await
    }

    /// Translate every matching transcript in a directory
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<BatchReport> {
        if !input_dir.is_dir() {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let files = FileManager::find_files(&input_dir, &self.config.batch.file_pattern, self.config.batch.recursive)?;
        if files.is_empty() {
            return Err(anyhow!(
                "No files matching '{}' found in directory: {:?}",
                self.config.batch.file_pattern,
                input_dir
            ));
        }

        let output_dir = output_dir.unwrap_or_else(|| self.default_output_dir(&input_dir));
        self.process(files, &output_dir, force_overwrite, true).await
    }

    /// Output folder from the configuration, else `processed` next to the input folder
    pub fn default_output_dir(&self, input_dir: &Path) -> PathBuf {
        if let Some(configured) = &self.config.batch.output_dir {
            return PathBuf::from(configured);
        }
        match input_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(DEFAULT_OUTPUT_FOLDER),
            _ => input_dir.join(DEFAULT_OUTPUT_FOLDER),
        }
    }

    async fn process(&self, files: Vec<PathBuf>, output_dir: &Path, force_overwrite: bool, show_file_bar: bool) -> Result<BatchReport> {
        let start_time = Instant::now();
        FileManager::ensure_dir(output_dir)?;

        info!(
            "{} - {} | {} -> {} | {} file(s)",
            self.config.translation.provider.display_name(),
            self.config.translation.get_model(),
            self.config.source_language,
            self.config.target_language,
            files.len()
        );

        let pipeline = NotesPipeline::from_config(&self.config, Arc::clone(&self.translator));
        let options = BatchOptions::from_config(&self.config, output_dir, force_overwrite);
        let coordinator = BatchCoordinator::new(pipeline, options);

        let observer = ProgressObserver::new(show_file_bar.then_some(files.len()));
        let report = coordinator.run(&files, &self.cancel, &observer).await;
        observer.finish();

        let duration = start_time.elapsed();
        for line in report.summary().lines() {
            info!("{}", line);
        }
        info!("Finished in {}", Self::format_duration(duration));

        if report.has_failures() {
            let log_path = output_dir.join(ISSUES_LOG_FILE);
            let line = format!(
                "Run finished with {} failed and {} partial file(s) - Duration: {}",
                report.count(FileStatus::Failed),
                report.count(FileStatus::Partial),
                Self::format_duration(duration)
            );
            match FileManager::append_to_log_file(&log_path, &line) {
                Ok(()) => warn!("Issues written to {}", log_path.display()),
                Err(e) => warn!("Failed to write issue log: {}", e),
            }
        }

        if let Some(report_path) = &self.config.batch.report_file {
            report.write_json(report_path)?;
            info!("Report written to {}", report_path);
        }

        Ok(report)
    }

    // Format duration in a human-readable format
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// Progress bars: one for the folder, one per file being translated
struct ProgressObserver {
    multi_progress: MultiProgress,
    file_bar: Option<ProgressBar>,
    chunk_bars: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl ProgressObserver {
    fn new(file_count: Option<usize>) -> Self {
        let multi_progress = MultiProgress::new();
        let file_bar = file_count.map(|count| {
            let bar = multi_progress.add(ProgressBar::new(count as u64));
            bar.set_style(Self::style("files"));
            bar.set_message("Processing files");
            bar
        });
        Self {
            multi_progress,
            file_bar,
            chunk_bars: Mutex::new(HashMap::new()),
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

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn finish(&self) {
        if let Some(bar) = &self.file_bar {
            bar.finish_with_message("Folder processing complete");
        }
        for (_, bar) in self.chunk_bars.lock().drain() {
            bar.finish_and_clear();
        }
    }
}

impl BatchObserver for ProgressObserver {
    fn file_started(&self, input: &Path, _position: usize, _total: usize) {
        let bar = self.multi_progress.add(ProgressBar::new(0));
        bar.set_style(Self::style("chunks"));
        bar.set_message(Self::file_name(input));
        self.chunk_bars.lock().insert(input.to_path_buf(), bar);
        if let Some(file_bar) = &self.file_bar {
            file_bar.set_message(format!("Processing: {}", Self::file_name(input)));
        }
    }

    fn chunk_progress(&self, input: &Path, completed: usize, total: usize) {
        if let Some(bar) = self.chunk_bars.lock().get(input) {
            bar.set_length(total as u64);
            bar.set_position(completed as u64);
        }
    }

    fn file_finished(&self, report: &FileReport) {
        if let Some(bar) = self.chunk_bars.lock().remove(&report.input) {
            bar.finish_and_clear();
        }
        if let Some(file_bar) = &self.file_bar {
            file_bar.inc(1);
        }
        match report.status {
            FileStatus::Failed => error!(
                "{}: {}",
                Self::file_name(&report.input),
                report.error.as_deref().unwrap_or("failed")
            ),
            FileStatus::Partial => warn!(
                "{}: {} of {} chunks failed",
                Self::file_name(&report.input),
                report.failed_chunks.len(),
                report.chunk_count
            ),
            _ => {}
        }
    }
}
