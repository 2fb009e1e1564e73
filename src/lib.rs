/*!
 * # subnotes - bilingual study notes from lecture transcripts
 *
 * A Rust library that turns long English transcripts into bilingual
 * (English / target language) Markdown study notes using AI translation.
 *
 * ## Features
 *
 * - Paragraph-aware chunking that never splits a paragraph
 * - Concurrent translation with a bounded number of requests in flight
 * - Per-chunk retry with exponential backoff, isolated failures
 * - Strict reassembly in transcript order, whatever the completion order
 * - Translation providers:
 *   - DeepSeek and OpenAI (chat completions)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Folder processing with a per-file report
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::segmenter`: Transcript chunking
 *   - `translation::client`: Single-chunk translation calls
 *   - `translation::dispatcher`: Concurrent dispatch with retry
 *   - `translation::assembler`: Document reassembly
 *   - `translation::batch`: Folder processing
 * - `providers`: Client implementations for various LLM providers
 * - `report`: Batch reports
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
// Test names follow the test_subject_condition_shouldOutcome convention
#![cfg_attr(test, allow(non_snake_case))]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod report;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, PipelineError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, normalize_to_part2t};
pub use report::{BatchReport, FileReport, FileStatus};
pub use translation::{NotesPipeline, Segmenter, TranslationService};
