//! End-to-end tests for stream mode
//! Tests: Text input -> paced provider calls -> one concatenated audio body

use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{body::to_bytes, http::StatusCode};
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

use crate::common::*;

/// Numbers each provider response so ordering is visible in the output.
#[derive(Default)]
struct NumberedParts {
    calls: AtomicUsize,
}

impl Respond for NumberedParts {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200).set_body_bytes(format!("<part{n}>").into_bytes())
    }
}

#[tokio::test]
async fn test_stream_concatenates_parts_in_order() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(NumberedParts::default())
        .mount(&mock)
        .await;
    let (app, state) = create_test_app(&mock);

    let text = long_text(4000);
    let total = state.relay.segments_for(&text).len();

    let response = app
        .oneshot(authed_post("/tts", &json!({"text": text, "mode": "stream"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    assert!(response.headers().get("content-disposition").is_none());

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let expected: String = (1..=total).map(|n| format!("<part{n}>")).collect();
    assert_eq!(body, expected);
    assert_eq!(state.metrics.relay.snapshot().segments_dispatched, total as u64);
}

#[tokio::test]
async fn test_stream_content_type_follows_encoding() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(NumberedParts::default())
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({"text": "Hello there.", "mode": "stream", "encoding": "wav"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/wav");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "<part1>");
}

#[tokio::test]
async fn test_stream_first_segment_failure_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&mock)
        .await;
    let (app, _) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({"text": long_text(4000), "mode": "stream"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["upstream_status"], 401);
    assert_eq!(mock.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_stream_later_failure_aborts_body() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<part1>".to_vec()))
        .up_to_n_times(1)
        .mount(&mock)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;
    let (app, state) = create_test_app(&mock);

    let response = app
        .oneshot(authed_post(
            "/tts",
            &json!({"text": long_text(4000), "mode": "stream"}),
        ))
        .await
        .unwrap();

    // Headers are already committed; the failure surfaces as a broken body.
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
    assert_eq!(mock.received_requests().await.unwrap().len(), 2);
    assert_eq!(state.metrics.relay.snapshot().upstream_errors, 1);
}
