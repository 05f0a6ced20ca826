//! Axum endpoint orchestrating the webhook pipeline.
//!
//! Per request: signature check → JSON parse → shape classification →
//! token check → dispatch → fixed-shape response. Validation failures
//! answer 400 with the reason; anything unexpected answers 500. Once a
//! callback is accepted the response is 200 `{"code":0}` no matter what
//! happens during dispatch — the platform retries deliveries that do not
//! get a 200, so internal processing failures are only logged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

use super::envelope::WebhookEnvelope;
use super::{signature, ValidationError};
use super::{REQUEST_ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::config::Config;
use crate::event::{EventDispatcher, URL_VERIFICATION_EVENT};

/// Shared state for the webhook handler.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (credentials, encrypt key).
    pub config: Arc<Config>,
    /// Dispatcher the endpoint hands accepted events to.
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    /// Bundle config and dispatcher into handler state.
    pub fn new(config: Arc<Config>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { config, dispatcher }
    }
}

/// Build the webhook router.
///
/// A panic anywhere in the pipeline is caught and answered with the
/// fixed 500 shape instead of tearing down the connection.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/lark/webhook", post(lark_webhook))
        .layer(CatchPanicLayer::custom(internal_error_response))
        .with_state(state)
}

fn internal_error_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "webhook handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "code": 500, "msg": "Internal server error" })),
    )
        .into_response()
}

/// Bind the listen address and serve the router until shutdown.
pub async fn serve(state: AppState, listen_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "webhook server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

enum Reply {
    Challenge(String),
    Accepted,
}

async fn lark_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match process(&state, &headers, &body).await {
        Ok(Reply::Challenge(challenge)) => {
            (StatusCode::OK, Json(json!({ "challenge": challenge }))).into_response()
        }
        Ok(Reply::Accepted) => (StatusCode::OK, Json(json!({ "code": 0 }))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn process(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Reply, ValidationError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    signature::verify(
        header(SIGNATURE_HEADER),
        header(TIMESTAMP_HEADER),
        header(REQUEST_ID_HEADER),
        body,
        &state.config.lark.encrypt_key,
    )?;

    let envelope = WebhookEnvelope::parse(body)?;
    envelope.verify_token(&state.config.lark.verification_token)?;

    match envelope {
        WebhookEnvelope::UrlVerification { challenge, token } => {
            info!("URL verification observed");
            state
                .dispatcher
                .dispatch(
                    URL_VERIFICATION_EVENT,
                    json!({ "challenge": challenge.clone(), "token": token }),
                    Default::default(),
                )
                .await;
            Ok(Reply::Challenge(challenge))
        }
        WebhookEnvelope::EventCallback { header, event } => {
            info!(
                event_type = %header.event_type,
                event_id = %header.event_id,
                tenant_key = %header.tenant_key,
                "event callback accepted"
            );
            // Past this point nothing may change the 200. The dispatcher
            // logs listener failures itself; this is belt and braces for
            // anything that slips out.
            let context = header.context();
            state
                .dispatcher
                .dispatch(&header.event_type, event, context)
                .await;
            Ok(Reply::Accepted)
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        warn!(error = %self, "webhook validation failed");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": 400, "msg": self.to_string() })),
        )
            .into_response()
    }
}
