//! Webhook body parsing and verification-token checks.
//!
//! A decoded body takes one of two shapes: the registration-time
//! challenge (`"type": "url_verification"`) or an event callback (a
//! `header` object with an `event_type`). Anything else is rejected.

use serde::Deserialize;
use serde_json::Value;

use super::ValidationError;
use crate::event::EventContext;

/// A parsed webhook body. Request-scoped; dropped once the response is
/// written.
#[derive(Debug, Clone)]
pub enum WebhookEnvelope {
    /// Endpoint-registration challenge to echo back.
    UrlVerification {
        /// Opaque string that must be reflected byte-for-byte.
        challenge: String,
        /// Verification token, if the platform sent one.
        token: Option<String>,
    },
    /// A subscribed event delivery.
    EventCallback {
        /// Routing metadata.
        header: EventHeader,
        /// Raw event body.
        event: Value,
    },
}

/// The `header` object of an event callback.
#[derive(Debug, Clone, Deserialize)]
pub struct EventHeader {
    /// Wire event-type string, e.g. `im.message.receive_v1`.
    pub event_type: String,
    /// Unique delivery identifier.
    #[serde(default)]
    pub event_id: String,
    /// Originating tenant.
    #[serde(default)]
    pub tenant_key: String,
    /// Receiving application.
    #[serde(default)]
    pub app_id: String,
    /// Verification token for this delivery.
    #[serde(default)]
    pub token: String,
}

impl EventHeader {
    /// Extract the routing context carried into dispatched events.
    pub fn context(&self) -> EventContext {
        EventContext {
            event_id: self.event_id.clone(),
            tenant_key: self.tenant_key.clone(),
            app_id: self.app_id.clone(),
        }
    }
}

impl WebhookEnvelope {
    /// Parse and classify a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;

        if value.get("type").and_then(Value::as_str) == Some("url_verification") {
            let challenge = value
                .get("challenge")
                .and_then(Value::as_str)
                .ok_or(ValidationError::UnknownEventShape)?
                .to_owned();
            let token = value
                .get("token")
                .and_then(Value::as_str)
                .map(|t| t.to_owned());
            return Ok(Self::UrlVerification { challenge, token });
        }

        if let Some(header) = value.get("header") {
            if header.get("event_type").and_then(Value::as_str).is_some() {
                let header: EventHeader = serde_json::from_value(header.clone())
                    .map_err(|_| ValidationError::UnknownEventShape)?;
                let event = value.get("event").cloned().unwrap_or(Value::Null);
                return Ok(Self::EventCallback { header, event });
            }
        }

        Err(ValidationError::UnknownEventShape)
    }

    /// Check the embedded verification token against the configured one.
    ///
    /// The challenge shape carries the token at the top level, callbacks
    /// carry it in the header; a missing or empty token always fails.
    pub fn verify_token(&self, expected: &str) -> Result<(), ValidationError> {
        match self {
            Self::UrlVerification { token, .. } => match token {
                Some(token) if token == expected => Ok(()),
                Some(_) => Err(ValidationError::TokenMismatch),
                None => Err(ValidationError::MissingToken),
            },
            Self::EventCallback { header, .. } => {
                if header.token.is_empty() {
                    Err(ValidationError::MissingToken)
                } else if header.token == expected {
                    Ok(())
                } else {
                    Err(ValidationError::TokenMismatch)
                }
            }
        }
    }
}
