/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI-compatible chat completions (DeepSeek, OpenAI)
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 * - Mock: scripted provider for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;
use crate::translation::prompts::TranslationPrompt;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation client.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Build the provider's wire request from a rendered prompt
    fn build_request(&self, prompt: &TranslationPrompt) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Read an error response body, never failing
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string())
}

/// Join a base endpoint and an API path, tolerating trailing slashes
pub(crate) fn join_endpoint(endpoint: &str, path: &str) -> Result<String, ProviderError> {
    let base = format!("{}/", endpoint.trim_end_matches('/'));
    let base = url::Url::parse(&base)
        .map_err(|e| ProviderError::InvalidRequest(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
    base.join(path.trim_start_matches('/'))
        .map(|url| url.to_string())
        .map_err(|e| ProviderError::InvalidRequest(format!("Invalid endpoint '{}': {}", endpoint, e)))
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
