/*!
 * Single-call translation client.
 *
 * `ChunkTranslator` is the seam the dispatcher talks to: one chunk of text in,
 * translated text or a classified `TranslationError` out. `TranslationClient`
 * implements it on top of any `Provider`; `TranslationService::from_config`
 * picks the provider from configuration.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{Config, TranslationProvider};
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::anthropic::Anthropic;
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::translation::formatting::clean_model_output;
use crate::translation::prompts::{PromptTemplate, TranslationPromptBuilder};

/// Translates one chunk per call; implementations keep no state between calls
#[async_trait]
pub trait ChunkTranslator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslationError>;

    /// Verify that the remote service is reachable and accepts our credentials
    async fn check(&self) -> Result<(), TranslationError>;
}

/// `ChunkTranslator` backed by a provider
#[derive(Debug)]
pub struct TranslationClient<P: Provider> {
    provider: P,
    prompts: TranslationPromptBuilder,
    /// Upper bound for a single provider call
    per_call_timeout: Duration,
}

impl<P: Provider> TranslationClient<P> {
    pub fn new(provider: P, prompts: TranslationPromptBuilder, per_call_timeout: Duration) -> Self {
        Self {
            provider,
            prompts,
            per_call_timeout,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> ChunkTranslator for TranslationClient<P>
where
    P: Provider + Send + Sync,
    P::Request: Send,
    P::Response: Send,
{
    async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        let prompt = self.prompts.build(text);
        let request = self.provider.build_request(&prompt);

        let started = Instant::now();
        let response = match tokio::time::timeout(self.per_call_timeout, self.provider.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                let millis = u64::try_from(self.per_call_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("Translation call timed out after {}ms", millis);
                return Err(ProviderError::Timeout(millis).into());
            }
        };
        debug!("Provider answered in {:.2}s", started.elapsed().as_secs_f64());

        let raw = P::extract_text(&response);
        if raw.trim().is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        let cleaned = clean_model_output(&raw);
        if cleaned.is_empty() {
            return Err(TranslationError::Content(
                "Response held no translation after cleanup".to_string(),
            ));
        }

        Ok(cleaned)
    }

    async fn check(&self) -> Result<(), TranslationError> {
        match tokio::time::timeout(self.per_call_timeout, self.provider.test_connection()).await {
            Ok(result) => result.map_err(TranslationError::from),
            Err(_) => Err(ProviderError::Timeout(
                u64::try_from(self.per_call_timeout.as_millis()).unwrap_or(u64::MAX),
            )
            .into()),
        }
    }
}

/// Builds the configured translator
pub struct TranslationService;

impl TranslationService {
    /// Select and construct the provider named by the configuration
    pub fn from_config(config: &Config) -> Result<Arc<dyn ChunkTranslator>> {
        let translation = &config.translation;
        let prompts = Self::prompt_builder(config)?;
        let timeout = translation.get_timeout();
        let model = translation.get_model();
        let endpoint = translation.get_endpoint();

        let translator: Arc<dyn ChunkTranslator> = match translation.provider {
            TranslationProvider::DeepSeek | TranslationProvider::OpenAI => {
                let api_key = translation.get_api_key();
                if api_key.is_empty() {
                    return Err(anyhow!(
                        "No API key configured for {}",
                        translation.provider.display_name()
                    ));
                }
                Arc::new(TranslationClient::new(
                    OpenAI::new(api_key, endpoint, model),
                    prompts,
                    timeout,
                ))
            }
            TranslationProvider::Anthropic => {
                let api_key = translation.get_api_key();
                if api_key.is_empty() {
                    return Err(anyhow!("No API key configured for Anthropic"));
                }
                Arc::new(TranslationClient::new(
                    Anthropic::new(api_key, endpoint, model),
                    prompts,
                    timeout,
                ))
            }
            TranslationProvider::Ollama => Arc::new(TranslationClient::new(
                Ollama::new(endpoint, model),
                prompts,
                timeout,
            )),
        };

        Ok(translator)
    }

    /// Prompt builder for the configured language pair and generation settings
    pub fn prompt_builder(config: &Config) -> Result<TranslationPromptBuilder> {
        let source_name = language_utils::get_language_name(&config.source_language)?;
        let target_name = language_utils::get_language_name(&config.target_language)?;
        let template = PromptTemplate::new(&config.translation.common.system_prompt);

        Ok(TranslationPromptBuilder::new(&template, &source_name, &target_name)
            .with_temperature(config.translation.common.temperature)
            .with_max_tokens(config.translation.get_max_tokens()))
    }
}
