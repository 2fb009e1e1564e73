/*!
 * Common test utilities for the subnotes test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use subnotes::providers::mock::MockProvider;
use subnotes::translation::{
    ChunkTranslator, DispatchOptions, PromptTemplate, RetryPolicy, TranslationClient, TranslationPromptBuilder,
};

/// Route library logs through the test harness; `RUST_LOG=debug` shows them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Transcript of `count` blank-line separated paragraphs, two lines each
pub fn sample_transcript(count: usize) -> String {
    (1..=count)
        .map(|n| format!("This is paragraph {} of the lecture,\nand it ends here.\n", n))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Transcript where every paragraph is a single sentence line
pub fn one_line_paragraphs(count: usize) -> String {
    (1..=count).map(|n| format!("Sentence number {}.\n", n)).collect()
}

/// Wrap a mock provider into the translator the pipeline expects
pub fn mock_translator(provider: MockProvider) -> Arc<dyn ChunkTranslator> {
    let prompts = TranslationPromptBuilder::new(&PromptTemplate::new(""), "English", "Chinese");
    Arc::new(TranslationClient::new(provider, prompts, Duration::from_secs(5)))
}

/// Dispatch settings with millisecond backoff so retry tests stay fast
pub fn fast_dispatch(max_concurrent_requests: usize, max_attempts: u32) -> DispatchOptions {
    DispatchOptions {
        max_concurrent_requests,
        retry: RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4)),
        run_timeout: None,
    }
}
