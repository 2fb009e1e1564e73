/*!
 * Chunk model shared by the segmenter, dispatcher and assembler.
 *
 * A chunk is a contiguous run of transcript lines identified by its
 * position in the transcript. Its source text is fixed at creation; the
 * dispatcher only ever fills in the target text, status and attempt count.
 */

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::TranslationError;

/// Lifecycle of a chunk inside one dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl ChunkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::InFlight => 1,
            Self::Succeeded => 2,
            Self::Failed => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::InFlight,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// One unit of translation work
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    index: usize,
    source: String,
    line_count: usize,
    /// Translated text, present once the chunk succeeded
    pub target: Option<String>,
    pub status: ChunkStatus,
    pub attempts: u32,
}

impl Chunk {
    pub fn new(index: usize, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_count = source.lines().count();
        Self {
            index,
            source,
            line_count,
            target: None,
            status: ChunkStatus::Pending,
            attempts: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Exact source text, terminators included
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Whether the chunk holds nothing but whitespace
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// Terminal outcome of one chunk's unit of work
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkResult {
    pub index: usize,
    pub outcome: Result<String, TranslationError>,
    /// Number of the attempt that produced the outcome
    pub attempt: u32,
    /// Wall time of the whole unit, backoff included
    pub elapsed: Duration,
}

impl ChunkResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&TranslationError> {
        self.outcome.as_ref().err()
    }
}
