/*!
 * Tests for the HTTP providers against a local mock server
 */

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use subtrans::providers::Provider;
use subtrans::providers::gemini::Gemini;
use subtrans::providers::ollama::Ollama;

fn gemini_for(server: &MockServer) -> Gemini {
    Gemini::new(server.uri(), "gemini-2.0-flash", "test-key", 0.3, 5).unwrap()
}

/// Gemini sends the prompt as the first part and reads the first candidate
#[tokio::test]
async fn test_gemini_complete_withCandidate_shouldReturnText() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "Translate this" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Traduis ceci" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = gemini_for(&server).complete("Translate this").await.unwrap();

    assert_eq!(reply.status, 200);
    assert_eq!(reply.text.as_deref(), Some("Traduis ceci"));
}

/// A rate-limit status is a reply, not an error
#[tokio::test]
async fn test_gemini_complete_withRateLimit_shouldReturnStatusWithoutText() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let reply = gemini_for(&server).complete("Hello").await.unwrap();

    assert_eq!(reply.status, 429);
    assert!(reply.text.is_none());
    assert!(!reply.is_success());
}

/// A success body without candidates has no text
#[tokio::test]
async fn test_gemini_complete_withoutCandidates_shouldReturnNoText() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "promptFeedback": {} })))
        .mount(&server)
        .await;

    let reply = gemini_for(&server).complete("Hello").await.unwrap();

    assert!(reply.is_success());
    assert!(reply.text.is_none());
}

/// An unreachable endpoint is a transport error
#[tokio::test]
async fn test_gemini_complete_withUnreachableServer_shouldReturnError() {
    let gemini = Gemini::new("http://127.0.0.1:9", "gemini-2.0-flash", "k", 0.3, 2).unwrap();
    assert!(gemini.complete("Hello").await.is_err());
}

/// Ollama posts a non-streaming generate request
#[tokio::test]
async fn test_ollama_complete_withResponse_shouldReturnText() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": "llama3.2", "stream": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "Bonjour",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ollama = Ollama::new(server.uri(), "llama3.2", 0.3, 5).unwrap();
    let reply = ollama.complete("Hello").await.unwrap();

    assert_eq!(reply.text.as_deref(), Some("Bonjour"));
}

/// Ollama error statuses are passed through
#[tokio::test]
async fn test_ollama_complete_withServerError_shouldReturnStatus() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ollama = Ollama::new(server.uri(), "llama3.2", 0.3, 5).unwrap();
    let reply = ollama.complete("Hello").await.unwrap();

    assert_eq!(reply.status, 500);
    assert!(reply.text.is_none());
}
