//! Tests for `handler::HandlerRegistry` ordering and failure isolation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use larkgate::event::{EventContext, LarkEvent, MessageEvent};
use larkgate::handler::{HandlerRegistry, MessageHandler, Outcome, CATCH_ALL_PRIORITY};

fn text_message() -> MessageEvent {
    let event = LarkEvent::new(
        "im.message.receive_v1",
        serde_json::json!({
            "sender": { "sender_id": { "open_id": "ou_1" } },
            "message": {
                "message_id": "om_1",
                "chat_id": "oc_1",
                "chat_type": "p2p",
                "message_type": "text",
                "content": "{\"text\":\"ping\"}"
            }
        }),
        EventContext::default(),
    );
    MessageEvent::from_event(&event).expect("fixture should parse")
}

struct StubHandler {
    label: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
    supports: bool,
    outcome: Outcome,
    fail: bool,
}

impl StubHandler {
    fn register_args(
        label: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        supports: bool,
        outcome: Outcome,
        fail: bool,
    ) -> Arc<dyn MessageHandler> {
        Arc::new(Self {
            label,
            log: Arc::clone(log),
            supports,
            outcome,
            fail,
        })
    }
}

#[async_trait]
impl MessageHandler for StubHandler {
    fn supports(&self, _message: &MessageEvent) -> bool {
        self.supports
    }

    async fn handle(&self, _message: &MessageEvent) -> anyhow::Result<Outcome> {
        self.log.lock().expect("lock").push(self.label);
        if self.fail {
            anyhow::bail!("{} failed", self.label);
        }
        Ok(self.outcome)
    }

    fn name(&self) -> &str {
        self.label
    }
}

#[tokio::test]
async fn highest_priority_supporting_handler_claims_the_message() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("catch_all", &log, true, Outcome::Stop, false),
            CATCH_ALL_PRIORITY,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("zero", &log, true, Outcome::Stop, false),
            0,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("fifty", &log, true, Outcome::Stop, false),
            50,
        )
        .await;

    registry.handle_message(&text_message()).await;

    // Only the priority-50 handler runs; the rest are never invoked.
    assert_eq!(log.lock().expect("lock").clone(), vec!["fifty"]);
}

#[tokio::test]
async fn unsupporting_handlers_are_skipped() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("picky", &log, false, Outcome::Stop, false),
            50,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("fallback", &log, true, Outcome::Stop, false),
            CATCH_ALL_PRIORITY,
        )
        .await;

    registry.handle_message(&text_message()).await;

    assert_eq!(log.lock().expect("lock").clone(), vec!["fallback"]);
}

#[tokio::test]
async fn continue_outcome_lets_lower_priorities_run() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("observer", &log, true, Outcome::Continue, false),
            100,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("responder", &log, true, Outcome::Stop, false),
            0,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("never", &log, true, Outcome::Stop, false),
            -10,
        )
        .await;

    registry.handle_message(&text_message()).await;

    assert_eq!(
        log.lock().expect("lock").clone(),
        vec!["observer", "responder"]
    );
}

#[tokio::test]
async fn failing_handler_does_not_block_the_rest() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("broken", &log, true, Outcome::Stop, true),
            50,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("healthy", &log, true, Outcome::Stop, false),
            0,
        )
        .await;

    registry.handle_message(&text_message()).await;

    // The broken handler ran and failed; the healthy one still got the
    // message.
    assert_eq!(
        log.lock().expect("lock").clone(),
        vec!["broken", "healthy"]
    );
}

#[tokio::test]
async fn equal_priorities_keep_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("first", &log, true, Outcome::Continue, false),
            10,
        )
        .await;
    registry
        .register(
            StubHandler::register_args("second", &log, true, Outcome::Continue, false),
            10,
        )
        .await;

    registry.handle_message(&text_message()).await;

    assert_eq!(
        log.lock().expect("lock").clone(),
        vec!["first", "second"]
    );
}

#[tokio::test]
async fn no_supporting_handler_is_not_an_error() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();
    registry
        .register(
            StubHandler::register_args("picky", &log, false, Outcome::Stop, false),
            0,
        )
        .await;

    // Logs a warning and returns; nothing to assert beyond not panicking.
    registry.handle_message(&text_message()).await;
    assert!(log.lock().expect("lock").is_empty());
    assert_eq!(registry.len().await, 1);
    assert!(!registry.is_empty().await);
}

#[tokio::test]
async fn late_registration_is_picked_up_by_the_next_cycle() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = HandlerRegistry::new();

    registry
        .register(
            StubHandler::register_args("early", &log, true, Outcome::Stop, false),
            0,
        )
        .await;
    registry.handle_message(&text_message()).await;

    // A higher-priority handler registered after the first cycle wins
    // the second one (the sorted cache is invalidated).
    registry
        .register(
            StubHandler::register_args("vip", &log, true, Outcome::Stop, false),
            99,
        )
        .await;
    registry.handle_message(&text_message()).await;

    assert_eq!(
        log.lock().expect("lock").clone(),
        vec!["early", "vip"]
    );
}
