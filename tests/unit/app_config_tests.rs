/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use std::time::Duration;
use subnotes::app_config::{Config, TranslationProvider};
use subnotes::translation::DispatchOptions;
use crate::common;

fn config_with_key() -> Config {
    let mut config = Config::default();
    config.translation.active_provider_config_mut().api_key = "test-key".to_string();
    config
}

/// A missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert!(path.exists());
    assert_eq!(config.source_language, "en");
    assert_eq!(config.translation.provider, TranslationProvider::DeepSeek);
    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.segmentation.chunk_lines, config.segmentation.chunk_lines);
    Ok(())
}

/// Partial files fall back to defaults for every missing field
#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"target_language": "fr", "segmentation": {"chunk_lines": 12}}"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.target_language, "fr");
    assert_eq!(config.segmentation.chunk_lines, 12);
    assert_eq!(config.batch.file_pattern, Config::default().batch.file_pattern);
    Ok(())
}

#[test]
fn test_load_or_create_withMalformedFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}

#[test]
fn test_validate_withValidConfig_shouldPass() {
    assert!(config_with_key().validate().is_ok());
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    let mut config = config_with_key();
    config.target_language = "not-a-language".to_string();
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.translation.common.temperature = 1.5;
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.segmentation.chunk_lines = 0;
    assert!(config.validate().is_err());

    let mut config = config_with_key();
    config.translation.common.retry_count = 0;
    assert!(config.validate().is_err());
}

/// Ollama runs locally and needs no key
#[test]
fn test_validate_withOllamaAndNoKey_shouldPass() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    assert!(config.validate().is_ok());
}

#[test]
fn test_dispatch_options_fromConfig_shouldUseRetryAndConcurrencySettings() {
    let mut config = config_with_key();
    config.translation.active_provider_config_mut().concurrent_requests = 7;
    config.translation.common.retry_count = 4;
    config.translation.common.run_timeout_secs = Some(90);

    let options = DispatchOptions::from_config(&config.translation);

    assert_eq!(options.max_concurrent_requests, 7);
    assert_eq!(options.retry.max_attempts(), 4);
    assert_eq!(options.run_timeout, Some(Duration::from_secs(90)));
}

/// Without a configured limit the provider profile decides
#[test]
fn test_dispatch_options_withUnsetConcurrency_shouldUseProviderProfile() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config.translation.active_provider_config_mut().concurrent_requests = 0;

    let options = DispatchOptions::from_config(&config.translation);

    assert_eq!(options.max_concurrent_requests, 2);
}
