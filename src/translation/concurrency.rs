/*!
 * Provider-specific concurrency tuning.
 *
 * Default number of chunks kept in flight per transcript, chosen from the
 * provider's rate limits. A value from the configuration always wins.
 */

use crate::app_config::TranslationProvider;

/// Provider-specific concurrency profile with tuned defaults
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
}

impl ProviderProfile {
    /// Get the profile for a given provider
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            TranslationProvider::DeepSeek => Self {
                // No published hard limit, but large chunks keep calls slow
                max_concurrent_requests: 4,
            },
            TranslationProvider::OpenAI => Self {
                max_concurrent_requests: 8,
            },
            TranslationProvider::Anthropic => Self {
                max_concurrent_requests: 5,
            },
            TranslationProvider::Ollama => Self {
                // Local model, one GPU
                max_concurrent_requests: 2,
            },
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override
            .filter(|n| *n > 0)
            .unwrap_or(self.max_concurrent_requests)
    }
}
