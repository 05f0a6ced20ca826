//! Tests driving the full axum router through `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use larkgate::config::Config;
use larkgate::event::{EventDispatcher, EventKind, EventListener, LarkEvent};
use larkgate::webhook::{router, signature, AppState};
use larkgate::webhook::{REQUEST_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};

const ENCRYPT_KEY: &str = "test-encrypt-key";
const VERIFICATION_TOKEN: &str = "test-verification-token";

fn test_state() -> (AppState, Arc<EventDispatcher>) {
    let mut config = Config::default();
    config.lark.encrypt_key = ENCRYPT_KEY.to_string();
    config.lark.verification_token = VERIFICATION_TOKEN.to_string();
    let dispatcher = Arc::new(EventDispatcher::new());
    let state = AppState::new(Arc::new(config), Arc::clone(&dispatcher));
    (state, dispatcher)
}

/// Build a correctly signed POST for the given body.
fn signed_request(body: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    signed_request_at(body, &timestamp)
}

fn signed_request_at(body: &str, timestamp: &str) -> Request<Body> {
    let sig = signature::compute(timestamp, "req-1", ENCRYPT_KEY, body.as_bytes());
    Request::builder()
        .method("POST")
        .uri("/lark/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, sig)
        .header(TIMESTAMP_HEADER, timestamp)
        .header(REQUEST_ID_HEADER, "req-1")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

fn callback_body(event_type: &str) -> String {
    serde_json::json!({
        "header": {
            "event_type": event_type,
            "event_id": "evt-1",
            "tenant_key": "tn-1",
            "app_id": "cli_x",
            "token": VERIFICATION_TOKEN
        },
        "event": { "anything": true }
    })
    .to_string()
}

struct FailingListener;

#[async_trait::async_trait]
impl EventListener for FailingListener {
    async fn on_event(&self, _event: &LarkEvent) -> anyhow::Result<()> {
        anyhow::bail!("listener exploded")
    }
}

struct RecordingListener {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl EventListener for RecordingListener {
    async fn on_event(&self, event: &LarkEvent) -> anyhow::Result<()> {
        self.seen
            .lock()
            .expect("lock")
            .push(event.event_type.clone());
        Ok(())
    }
}

#[tokio::test]
async fn challenge_is_echoed_exactly() {
    let (state, _) = test_state();
    let body = serde_json::json!({
        "type": "url_verification",
        "challenge": "ddjgjgf9-b0b5-dc39da577345",
        "token": VERIFICATION_TOKEN
    })
    .to_string();

    let response = router(state)
        .oneshot(signed_request(&body))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({ "challenge": "ddjgjgf9-b0b5-dc39da577345" })
    );
}

#[tokio::test]
async fn url_verification_publishes_internal_notification() {
    let (state, dispatcher) = test_state();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher
        .add_listener(
            EventKind::Generic,
            Arc::new(RecordingListener {
                seen: Arc::clone(&seen),
            }),
            0,
        )
        .await;

    let body = serde_json::json!({
        "type": "url_verification",
        "challenge": "c",
        "token": VERIFICATION_TOKEN
    })
    .to_string();

    let response = router(state)
        .oneshot(signed_request(&body))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        seen.lock().expect("lock").clone(),
        vec!["url_verification".to_string()]
    );
}

#[tokio::test]
async fn accepted_callback_answers_code_zero() {
    let (state, dispatcher) = test_state();
    let seen = Arc::new(Mutex::new(Vec::new()));
    dispatcher
        .add_listener(
            EventKind::Message,
            Arc::new(RecordingListener {
                seen: Arc::clone(&seen),
            }),
            0,
        )
        .await;

    let response = router(state)
        .oneshot(signed_request(&callback_body("im.message.receive_v1")))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "code": 0 }));
    assert_eq!(
        seen.lock().expect("lock").clone(),
        vec!["im.message.receive_v1".to_string()]
    );
}

#[tokio::test]
async fn callback_answers_200_even_when_listener_fails() {
    let (state, dispatcher) = test_state();
    dispatcher
        .add_listener(EventKind::Message, Arc::new(FailingListener), 0)
        .await;

    let response = router(state)
        .oneshot(signed_request(&callback_body("im.message.receive_v1")))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!({ "code": 0 }));
}

#[tokio::test]
async fn missing_headers_answer_400() {
    let (state, _) = test_state();
    let request = Request::builder()
        .method("POST")
        .uri("/lark/webhook")
        .header("content-type", "application/json")
        .body(Body::from(callback_body("im.message.receive_v1")))
        .expect("request should build");

    let response = router(state)
        .oneshot(request)
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], 400);
    assert_eq!(json["msg"], "missing headers");
}

#[tokio::test]
async fn stale_timestamp_answers_400_despite_valid_signature() {
    let (state, _) = test_state();
    let body = callback_body("im.message.receive_v1");
    let old = chrono::Utc::now()
        .timestamp()
        .saturating_sub(signature::REPLAY_WINDOW_SECS.saturating_add(10));

    let response = router(state)
        .oneshot(signed_request_at(&body, &old.to_string()))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["msg"], "stale timestamp");
}

#[tokio::test]
async fn tampered_body_answers_400() {
    let (state, _) = test_state();
    let body = callback_body("im.message.receive_v1");
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let sig = signature::compute(&timestamp, "req-1", ENCRYPT_KEY, body.as_bytes());

    // Same signature, one byte of body flipped.
    let tampered = body.replacen("anything", "anythinG", 1);
    assert_ne!(body, tampered);

    let request = Request::builder()
        .method("POST")
        .uri("/lark/webhook")
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, sig)
        .header(TIMESTAMP_HEADER, &timestamp)
        .header(REQUEST_ID_HEADER, "req-1")
        .body(Body::from(tampered))
        .expect("request should build");

    let response = router(state)
        .oneshot(request)
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["msg"], "signature mismatch");
}

#[tokio::test]
async fn wrong_verification_token_answers_400() {
    let (state, _) = test_state();
    let body = serde_json::json!({
        "header": {
            "event_type": "im.message.receive_v1",
            "event_id": "evt-1",
            "token": "not-the-right-token"
        },
        "event": {}
    })
    .to_string();

    let response = router(state)
        .oneshot(signed_request(&body))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["msg"], "token mismatch");
}

#[tokio::test]
async fn unknown_body_shape_answers_400() {
    let (state, _) = test_state();
    let body = r#"{"surprise":"neither shape"}"#;

    let response = router(state)
        .oneshot(signed_request(body))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["msg"], "unknown event type");
}

#[tokio::test]
async fn invalid_json_answers_400() {
    let (state, _) = test_state();

    let response = router(state)
        .oneshot(signed_request("this is not json"))
        .await
        .expect("router should respond");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 400);
}
