/*!
 * Error types for the subnotes application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 *
 * - `ProviderError`: raw failures of a provider HTTP call
 * - `TranslationError`: classified outcome of one chunk translation attempt
 * - `PipelineError`: whole-transcript failures (segmentation, assembly, partial runs)
 * - `AppError`: top-level wrapper, including per-file batch failures
 */

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a failed translation attempt should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Timeouts, rate limits, connection drops, 5xx: retried with backoff
    Transient,
    /// Authentication, malformed request: never retried
    Permanent,
    /// Empty or unparseable response body: retried with backoff
    Content,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The request could not be built, e.g. a malformed endpoint
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The call did not finish within its deadline
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// The provider answered successfully but without any text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Map an HTTP error status and body to the matching provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Map a reqwest transport error
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Classify the error for the retry loop
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::RateLimitExceeded(_)
            | Self::Timeout(_) => FailureKind::Transient,
            Self::ParseError(_) | Self::EmptyResponse => FailureKind::Content,
            Self::AuthenticationError(_) | Self::InvalidRequest(_) => FailureKind::Permanent,
            Self::ApiError { status_code, .. } => match status_code {
                408 | 409 | 425 | 429 => FailureKind::Transient,
                500..=599 => FailureKind::Transient,
                _ => FailureKind::Permanent,
            },
        }
    }
}

/// Errors produced by a single chunk translation attempt
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TranslationError {
    /// Failure that may succeed on a later attempt
    #[error("Transient translation failure: {0}")]
    Transient(String),

    /// Failure that will not succeed on retry
    #[error("Permanent translation failure: {0}")]
    Permanent(String),

    /// The service answered but the content was unusable
    #[error("Invalid translation content: {0}")]
    Content(String),
}

impl TranslationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transient(_) => FailureKind::Transient,
            Self::Permanent(_) => FailureKind::Permanent,
            Self::Content(_) => FailureKind::Content,
        }
    }

    /// Whether the retry loop may attempt the chunk again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Transient(message) | Self::Permanent(message) | Self::Content(message) => message,
        }
    }
}

impl From<ProviderError> for TranslationError {
    fn from(error: ProviderError) -> Self {
        let message = error.to_string();
        match error.failure_kind() {
            FailureKind::Transient => Self::Transient(message),
            FailureKind::Permanent => Self::Permanent(message),
            FailureKind::Content => Self::Content(message),
        }
    }
}

/// Errors that describe the outcome of a whole transcript run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The transcript produced no chunk at all
    #[error("Transcript could not be split into chunks: {0}")]
    SegmentationDefect(String),

    /// Some chunks failed; a best-effort document was still produced
    #[error("Partial document: {} of {total} chunks failed (indices {failed:?})", failed.len())]
    PartialDocument {
        /// Indices of the failed chunks
        failed: Vec<usize>,
        /// Total number of chunks
        total: usize,
    },

    /// The run was cancelled before every chunk finished
    #[error("Run cancelled after {completed} of {total} chunks")]
    Cancelled {
        /// Chunks with a terminal result when the run stopped
        completed: usize,
        /// Total number of chunks
        total: usize,
    },

    /// The assembler was handed a result map that does not match the chunk list
    #[error("Internal consistency violation: missing results {missing:?}, unexpected results {unexpected:?}")]
    InternalConsistency {
        /// Chunk indices without a terminal result
        missing: Vec<usize>,
        /// Result indices that match no chunk
        unexpected: Vec<usize>,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from a transcript run
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A single input of a batch could not be processed
    #[error("Failed to process {}: {message}", path.display())]
    BatchFile {
        /// The offending input file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
