//! Mock API tests for the HTTP collaborators
//!
//! These run the text-to-speech and generation clients against local
//! wiremock servers instead of the real endpoints.

use lecturecast::generate::{GeminiGenerator, Mode, OutlineGenerator};
use lecturecast::outline::Outline;
use lecturecast::synth::{GoogleTts, Synthesizer};
use lecturecast::LectureError;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Google TTS Mock Tests
// ============================================================================

mod tts_tests {
    use super::*;

    #[tokio::test]
    async fn test_download_appends_pieces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("client", "tw-ob"))
            .and(query_param("tl", "fr"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 600]))
            .expect(2)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp3");
        let tts = GoogleTts::new("fr").with_base_url(server.uri());

        // Two pieces: the text is longer than one request allows.
        let text = "word ".repeat(30);
        let written = tts.download(text.trim(), &dest).await.unwrap();

        assert_eq!(written, 1200);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 1200);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp3");
        let tts = GoogleTts::new("en").with_base_url(server.uri());

        let result = tts.synthesize("Ethics studies right action.", &dest).await;
        match result {
            Err(LectureError::Synthesis(msg)) => assert!(msg.contains("403")),
            other => panic!("expected synthesis error, got {:?}", other.map(|a| a.duration())),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_unplayable_audio_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not really audio"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp3");
        let tts = GoogleTts::new("en").with_base_url(server.uri());

        let result = tts.synthesize("Intro", &dest).await;
        assert!(matches!(result, Err(LectureError::Synthesis(_))));
        assert!(!dest.exists());
    }
}

// ============================================================================
// Gemini Generation Mock Tests
// ============================================================================

mod gemini_tests {
    use super::*;

    fn candidate(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" }
            }]
        })
    }

    #[tokio::test]
    async fn test_generate_outline() {
        let server = MockServer::start().await;
        let reply = "```json\n{\"Ethics\": {\"Intro\": \"Ethics studies right action.\"}}\n```";

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Task: Explain ethics" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(reply)))
            .expect(1)
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("test-key".to_string()).with_base_url(server.uri());
        let text = generator
            .generate(Mode::Text, "Explain ethics", None)
            .await
            .unwrap();

        let outline = Outline::parse(&text).unwrap();
        assert_eq!(outline.heading_count(), 1);
    }

    #[tokio::test]
    async fn test_system_instruction_follows_mode() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "systemInstruction": { "parts": [{ "text": Mode::Audio.system_instruction() }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("Ethics studies right action.")))
            .expect(1)
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("k".to_string())
            .with_model("gemini-2.0-flash")
            .with_base_url(server.uri());
        let text = generator
            .generate(Mode::Audio, "Narrate ethics", Some("Ethics studies right action."))
            .await
            .unwrap();

        assert_eq!(text, "Ethics studies right action.");
    }

    #[tokio::test]
    async fn test_api_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("bad".to_string()).with_base_url(server.uri());
        let result = generator.generate(Mode::Text, "x", None).await;

        match result {
            Err(LectureError::Api(msg)) => assert!(msg.contains("API key not valid")),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let generator = GeminiGenerator::new("k".to_string()).with_base_url(server.uri());
        let result = generator.generate(Mode::Text, "x", None).await;
        assert!(matches!(result, Err(LectureError::Api(_))));
    }
}
