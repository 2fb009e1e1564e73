/*!
 * Batch report: one entry per input file, in input order.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Final state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processed,
    /// Document written with placeholders for failed chunks
    Partial,
    Skipped,
    Failed,
    Cancelled,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Processed => "processed",
            Self::Partial => "partial",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    /// Document path, when a document was (or already had been) written
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub chunk_count: usize,
    pub failed_chunks: Vec<usize>,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(input: impl Into<PathBuf>, status: FileStatus) -> Self {
        Self {
            input: input.into(),
            output: None,
            status,
            chunk_count: 0,
            failed_chunks: Vec::new(),
            elapsed_secs: 0.0,
            error: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Append-only list of file outcomes
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Local>,
    entries: Vec<FileReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: FileReport) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[FileReport] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.entries.iter().filter(|entry| entry.status == status).count()
    }

    /// Whether any file failed outright or only partially
    pub fn has_failures(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| matches!(entry.status, FileStatus::Failed | FileStatus::Partial))
    }

    /// Human-readable summary, one line per file after a totals line
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "{} files: {} processed, {} partial, {} skipped, {} failed, {} cancelled",
            self.entries.len(),
            self.count(FileStatus::Processed),
            self.count(FileStatus::Partial),
            self.count(FileStatus::Skipped),
            self.count(FileStatus::Failed),
            self.count(FileStatus::Cancelled)
        )];

        for entry in &self.entries {
            let name = entry
                .input
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.input.display().to_string());
            let mut line = format!("  {:<9} {}", entry.status, name);
            if !entry.failed_chunks.is_empty() {
                line.push_str(&format!(
                    " ({} of {} chunks failed)",
                    entry.failed_chunks.len(),
                    entry.chunk_count
                ));
            }
            if let Some(error) = &entry.error {
                line.push_str(&format!(": {}", error));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize batch report")
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write report to {}", path.as_ref().display()))
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}
