/*!
 * Provider clients against a local HTTP mock server
 */

use httpmock::prelude::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

use subnotes::errors::{FailureKind, TranslationError};
use subnotes::providers::anthropic::Anthropic;
use subnotes::providers::ollama::Ollama;
use subnotes::providers::openai::OpenAI;
use subnotes::providers::Provider;
use subnotes::translation::{
    CancellationSignal, Chunk, ChunkTranslator, Dispatcher, PromptTemplate, TranslationClient, TranslationPromptBuilder,
};
use crate::common;

fn client<P: Provider>(provider: P) -> TranslationClient<P> {
    let prompts = TranslationPromptBuilder::new(&PromptTemplate::new(""), "English", "Chinese");
    TranslationClient::new(provider, prompts, Duration::from_secs(5))
}

fn openai(server: &MockServer) -> TranslationClient<OpenAI> {
    client(OpenAI::new("test-key", server.base_url(), "deepseek-chat"))
}

async fn openai_error(status: u16) -> TranslationError {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(status).body("simulated");
        })
        .await;
    openai(&server).translate("Hello.").await.unwrap_err()
}

#[tokio::test]
async fn test_openai_translate_withSuccessfulResponse_shouldReturnContent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key")
                .body_contains("Hello.");
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "你好。"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            }));
        })
        .await;

    let translated = openai(&server).translate("Hello.").await.unwrap();

    assert_eq!(translated, "你好。");
    mock.assert_async().await;
}

/// Authentication failures will not get better on retry
#[tokio::test]
async fn test_openai_translate_withUnauthorized_shouldBePermanent() {
    assert_eq!(openai_error(401).await.kind(), FailureKind::Permanent);
    assert_eq!(openai_error(400).await.kind(), FailureKind::Permanent);
}

#[tokio::test]
async fn test_openai_translate_withThrottlingOrOutage_shouldBeTransient() {
    assert_eq!(openai_error(429).await.kind(), FailureKind::Transient);
    assert_eq!(openai_error(503).await.kind(), FailureKind::Transient);
}

#[tokio::test]
async fn test_openai_translate_withNoChoices_shouldBeContentError() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;

    let error = openai(&server).translate("Hello.").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Content);
}

#[tokio::test]
async fn test_openai_translate_withMalformedBody_shouldBeContentError() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body("<html>gateway</html>");
        })
        .await;

    let error = openai(&server).translate("Hello.").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Content);
}

#[tokio::test]
async fn test_anthropic_translate_shouldSendKeyHeaderAndReadTextBlocks() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key")
                .header_exists("anthropic-version");
            then.status(200).json_body(json!({
                "content": [{"type": "text", "text": "第一段。\n\n第二段。"}],
                "usage": {"input_tokens": 20, "output_tokens": 8}
            }));
        })
        .await;

    let translator = client(Anthropic::new("test-key", server.base_url(), "claude-3-5-haiku-latest"));
    let translated = translator.translate("First.\n\nSecond.").await.unwrap();

    assert_eq!(translated, "第一段。\n\n第二段。");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ollama_translate_andCheck_shouldUseLocalEndpoints() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({"model": "llama3.2:3b", "response": "你好。", "done": true}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(json!({"models": []}));
        })
        .await;

    let translator = client(Ollama::new(server.base_url(), "llama3.2:3b"));

    assert_eq!(translator.translate("Hello.").await.unwrap(), "你好。");
    assert_ok!(translator.check().await);
}

/// An unreachable server is a transient connection failure
#[tokio::test]
async fn test_openai_translate_withUnreachableServer_shouldBeTransient() {
    let translator = client(OpenAI::new("test-key", "http://127.0.0.1:9", "deepseek-chat"));
    assert_err!(translator.check().await);
    let error = translator.translate("Hello.").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Transient);
}

/// A malformed endpoint cannot be fixed by retrying
#[tokio::test]
async fn test_openai_translate_withMalformedEndpoint_shouldBePermanent() {
    let translator = client(OpenAI::new("test-key", "not a url", "deepseek-chat"));
    let error = translator.translate("Hello.").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Permanent);
    assert!(matches!(error, TranslationError::Permanent(ref message) if message.contains("Invalid")));
}

/// Requests reqwest refuses to build are permanent too
#[tokio::test]
async fn test_ollama_translate_withUnsupportedScheme_shouldBePermanent() {
    let translator = client(Ollama::new("ftp://127.0.0.1:9", "llama3.2:3b"));
    let error = translator.translate("Hello.").await.unwrap_err();
    assert_eq!(error.kind(), FailureKind::Permanent);
}

#[tokio::test]
async fn test_dispatch_withMalformedEndpoint_shouldMakeOneAttempt() {
    let translator: Arc<dyn ChunkTranslator> =
        Arc::new(client(OpenAI::new("test-key", "not a url", "deepseek-chat")));
    let dispatcher = Dispatcher::new(translator, common::fast_dispatch(1, 3));

    let outcome = dispatcher
        .dispatch(vec![Chunk::new(0, "Hello.\n")], &CancellationSignal::new(), |_, _| {})
        .await;

    let result = &outcome.results[&0];
    assert_eq!(result.attempt, 1);
    assert_eq!(outcome.chunks[0].attempts, 1);
    assert!(matches!(result.error(), Some(TranslationError::Permanent(_))));
}
