//! End-to-end tests for file mode and single-shot synthesis
//! Tests: Text input -> segmenting -> paced provider calls -> zip / JSON output

use std::io::{Cursor, Read};
use std::time::Duration;

use axum::{body::to_bytes, http::StatusCode};
use base64::Engine;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

fn has_param(request: &wiremock::Request, key: &str) -> bool {
    request.url.query_pairs().any(|(k, _)| k == key)
}

#[tokio::test]
async fn test_file_mode_returns_zip_of_parts() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SPEAK_PATH))
        .and(header("authorization", format!("Token {TEST_API_KEY}").as_str()))
        .and(query_param("model", "aura-luna-en"))
        .and(query_param("encoding", "mp3"))
        .and(query_param("bit_rate", "48000"))
        .and(query_param("speed", "0.7"))
        .and(query_param("pitch", "0"))
        .and(query_param("language", "en"))
        .and(query_param("utterance_end_ms", "1000"))
        .and(query_param("filler_words", "true"))
        .and(query_param("smart_format", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
        .mount(&mock)
        .await;
    let (app, state) = create_test_app(&mock);

    let text = long_text(4000);
    let segments = state.relay.segments_for(&text);
    assert!(segments.len() >= 3, "expected at least 3 segments, got {}", segments.len());

    let response = app
        .oneshot(authed_post("/tts", &json!({"text": text})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=speech_chunks.zip"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    assert_eq!(zip.len(), segments.len());
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        assert_eq!(entry.name(), format!("speech_part_{:02}.mp3", i + 1));
        let mut audio = Vec::new();
        entry.read_to_end(&mut audio).unwrap();
        assert_eq!(audio, b"mp3-bytes");
    }

    // One provider call per segment, in order, carrying the segment text.
    let received = mock.received_requests().await.unwrap();
    assert_eq!(received.len(), segments.len());
    for (request, segment) in received.iter().zip(&segments) {
        let sent: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent["text"], segment.as_str());
    }

    let snapshot = state.metrics.relay.snapshot();
    assert_eq!(snapshot.segments_dispatched, segments.len() as u64);
    assert_eq!(snapshot.audio_bytes, 9 * segments.len() as u64);
}

#[tokio::test]
async fn test_file_mode_failure_returns_single_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
        .up_to_n_times(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;
    let (app, state) = create_test_app(&mock);

    let text = long_text(4000);
    assert!(state.relay.segments_for(&text).len() >= 3);

    let response = app
        .oneshot(authed_post("/tts", &json!({"text": text})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["content-type"], "application/json");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["code"], 502);
    assert_eq!(error["upstream_status"], 500);
    assert!(error["error"].as_str().unwrap().contains("boom"));

    // Dispatch stops at the failing segment.
    assert_eq!(mock.received_requests().await.unwrap().len(), 2);
    assert_eq!(state.metrics.relay.snapshot().upstream_errors, 1);
    assert_eq!(state.metrics.tts.stats().error_count, 1);
}

#[tokio::test]
async fn test_linear16_options() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("model", "aura-asteria-en"))
        .and(query_param("encoding", "linear16"))
        .and(query_param("sample_rate", "24000"))
        .and(query_param("speed", "1.2"))
        .and(query_param("utterance_end_ms", "800"))
        .and(query_param("filler_words", "true"))
        .and(query_param("disfluencies", "true"))
        .and(query_param("hesitations", "true"))
        .and(query_param("callback_url", "https://example.com/hook"))
        .and(query_param("callback_method", "post"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pcm".to_vec()))
        .expect(1)
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({
                "text": "Hello there.",
                "voice": "aura-asteria-en",
                "encoding": "linear16",
                "sample_rate": 24000,
                "bit_rate": 48000,
                "speed": 1.8,
                "utterance_end_ms": 300,
                "filler_words": true,
                "callback_url": "https://example.com/hook",
                "callback_method": "POST"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(body.to_vec())).unwrap();
    assert_eq!(zip.by_index(0).unwrap().name(), "speech_part_01.linear16");

    let received = mock.received_requests().await.unwrap();
    assert!(!has_param(&received[0], "bit_rate"));
    assert!(!has_param(&received[0], "container"));
}

#[tokio::test]
async fn test_mp3_bit_rate_coerced() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("encoding", "mp3"))
        .and(query_param("bit_rate", "48000"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
        .expect(1)
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({"text": "Hello there.", "bit_rate": 64000, "sample_rate": 16000}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let received = mock.received_requests().await.unwrap();
    assert!(!has_param(&received[0], "sample_rate"));
    assert!(!has_param(&received[0], "container"));
}

#[tokio::test]
async fn test_provider_timeout_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock)
        .await;
    let mut config = test_config(&mock);
    config.provider_timeout_secs = 1;
    let app = relay_server::create_router(relay_server::AppState::new(config));

    let response = app
        .oneshot(authed_post("/tts", &json!({"text": "Hello there."})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error.get("upstream_status").is_none());
}

#[tokio::test]
async fn test_single_shot_returns_base64_audio() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SPEAK_PATH))
        .and(query_param("encoding", "mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"whole-audio".to_vec()))
        .expect(1)
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/api/tts/single",
            &json!({
                "text": "# Greeting\nHello **world**.",
                "speed": 1.8,
                "utterance_end_ms": 300
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let reply: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(reply["encoding"], "mp3");
    assert_eq!(reply["bytes"], 11);
    let audio = base64::engine::general_purpose::STANDARD
        .decode(reply["audio_base64"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, b"whole-audio");

    // Single-shot sends speed and silence exactly as given.
    let received = mock.received_requests().await.unwrap();
    let query: Vec<(String, String)> = received[0].url.query_pairs().into_owned().collect();
    assert!(query.contains(&("speed".into(), "1.8".into())));
    assert!(query.contains(&("utterance_end_ms".into(), "300".into())));
    let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["text"], "Greeting Hello world.");
}

#[tokio::test]
async fn test_single_shot_upstream_error() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&mock)
        .await;
    let (app, state) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post("/tts/single", &json!({"text": "Hello."})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(state.metrics.tts_single.stats().error_count, 1);
}

#[tokio::test]
async fn test_null_options_fall_back_to_segment_pacing() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(query_param("speed", "0.95"))
        .and(query_param("utterance_end_ms", "1200"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
        .expect(1)
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({
                "text": "Hello there.",
                "mode": null,
                "speed": null,
                "utterance_end_ms": null,
                "filler_words": null,
                "pitch": null
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/zip");
    let received = mock.received_requests().await.unwrap();
    for key in ["filler_words", "disfluencies", "hesitations", "pitch"] {
        assert!(!has_param(&received[0], key), "{key}");
    }
}
