/*!
 * Mock provider implementations for testing.
 *
 * This module provides a provider that simulates different behaviors without
 * any network access:
 * - `MockProvider::working()` - Always succeeds, one tagged paragraph per source paragraph
 * - `MockProvider::intermittent(n)` - Every nth call fails with a 503
 * - `MockProvider::failing(status)` - Always fails with the given HTTP status
 * - `MockProvider::fail_first(n, status)` - The first n calls fail, later calls succeed
 *
 * Calls are counted and the peak number of simultaneous calls is recorded, so
 * tests can check retry counts and concurrency limits.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::Provider;
use crate::translation::formatting::split_paragraphs;
use crate::translation::prompts::TranslationPrompt;

/// Mock request for testing
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// The chunk to translate
    pub text: String,
    /// Rendered system prompt
    pub system: String,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request) with a 503
    Intermittent { fail_every: usize },
    /// Always fails with the given HTTP status
    Failing { status_code: u16 },
    /// The first N requests fail with the given status, later ones succeed
    FailFirst { failures: usize, status_code: u16 },
    /// Returns empty response
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Per-request hooks; plain function pointers keep the mock `Clone + Send + Sync`
type DelayFn = fn(&MockRequest) -> u64;
type ResponseFn = fn(&MockRequest) -> String;
type FailureFn = fn(&MockRequest) -> Option<ProviderError>;

/// Decrements the in-flight counter even when the call is dropped mid-way
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    /// Texts of all received requests, in arrival order
    requests: Arc<Mutex<Vec<String>>>,
    delay: Option<DelayFn>,
    custom_response: Option<ResponseFn>,
    failure_rule: Option<FailureFn>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            custom_response: None,
            failure_rule: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every: fail_every.max(1) })
    }

    /// Create a failing mock provider that always errors
    pub fn failing(status_code: u16) -> Self {
        Self::new(MockBehavior::Failing { status_code })
    }

    /// Create a mock whose first calls fail
    pub fn fail_first(failures: usize, status_code: u16) -> Self {
        Self::new(MockBehavior::FailFirst { failures, status_code })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a fixed delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Delay each request by a duration computed from its text
    pub fn with_delay(mut self, delay: DelayFn) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: ResponseFn) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Fail selected requests regardless of the behavior mode
    pub fn with_failure_rule(mut self, rule: FailureFn) -> Self {
        self.failure_rule = Some(rule);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were being served at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Requests currently being served
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Texts of received requests, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Default translation: every source paragraph tagged and kept in order
    pub fn translate_paragraphs(text: &str) -> String {
        split_paragraphs(text)
            .iter()
            .map(|paragraph| format!("[TRANSLATED] {}", paragraph))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn success(&self, request: &MockRequest) -> MockResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => Self::translate_paragraphs(&request.text),
        };
        MockResponse { text }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    fn build_request(&self, prompt: &TranslationPrompt) -> Self::Request {
        MockRequest {
            text: prompt.source_text.clone(),
            system: prompt.system.clone(),
        }
    }

    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.text.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        let mut delay_ms = self.delay.map(|delay| delay(&request)).unwrap_or(0);
        if let MockBehavior::Slow { delay_ms: slow } = self.behavior {
            delay_ms += slow;
        }
        // Always yield once so concurrent callers genuinely overlap
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }

        if let Some(error) = self.failure_rule.and_then(|rule| rule(&request)) {
            return Err(error);
        }

        match self.behavior {
            MockBehavior::Working | MockBehavior::Slow { .. } => Ok(self.success(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Failing { status_code } => Err(ProviderError::from_status(
                status_code,
                "Simulated provider failure",
            )),

            MockBehavior::FailFirst { failures, status_code } => {
                if count < failures {
                    Err(ProviderError::from_status(
                        status_code,
                        format!("Simulated failure (request #{})", count + 1),
                    ))
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Empty => Ok(MockResponse { text: String::new() }),
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing { status_code } => {
                Err(ProviderError::from_status(status_code, "Simulated provider failure"))
            }
            _ => Ok(()),
        }
    }

    fn extract_text(response: &Self::Response) -> String {
        response.text.clone()
    }
}
