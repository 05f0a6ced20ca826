//! Outbound Lark Open API client.
//!
//! Wraps the message-send endpoint with bearer-token auth from the
//! [`TokenManager`]. The Lark API wraps every response in a
//! `{code, msg, data}` envelope; a non-zero `code` is surfaced as an
//! error.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::card::Card;
use crate::config::LarkConfig;
use crate::token::{AuthError, TokenManager};

/// HTTP connect timeout for the API client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for the API client.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// An outbound API failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport-level failure.
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Token fetch failed before the call could be made.
    #[error("token unavailable: {0}")]
    Auth(#[from] AuthError),

    /// The API answered with a non-success HTTP status.
    #[error("API returned HTTP {0}")]
    HttpStatus(u16),

    /// The API envelope carried a non-zero code.
    #[error("API returned code {code}: {msg}")]
    Remote {
        /// Application-level status code.
        code: i64,
        /// Remote error message.
        msg: String,
    },
}

/// How the `receive_id` of an outbound message is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveIdType {
    /// Per-app user identifier.
    OpenId,
    /// Developer-wide user identifier.
    UnionId,
    /// Tenant-scoped user identifier.
    UserId,
    /// Group or private chat identifier.
    ChatId,
    /// User email address.
    Email,
}

impl ReceiveIdType {
    /// Wire value for the `receive_id_type` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiveIdType::OpenId => "open_id",
            ReceiveIdType::UnionId => "union_id",
            ReceiveIdType::UserId => "user_id",
            ReceiveIdType::ChatId => "chat_id",
            ReceiveIdType::Email => "email",
        }
    }
}

/// Response envelope the Lark API wraps every payload in.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// `data` of a successful message send.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    /// Identifier of the created message.
    pub message_id: String,
}

/// Client for the Lark Open API message endpoints.
pub struct LarkClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl LarkClient {
    /// Build a client from the Lark config and a shared token manager.
    pub fn new(config: &LarkConfig, tokens: Arc<TokenManager>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            http,
            base_url: config.base_url.clone(),
            tokens,
        }
    }

    /// Send a plain text message.
    pub async fn send_text(
        &self,
        id_type: ReceiveIdType,
        receive_id: &str,
        text: &str,
    ) -> Result<SentMessage, ApiError> {
        let content = serde_json::json!({ "text": text }).to_string();
        self.send_message(id_type, receive_id, "text", content).await
    }

    /// Send an interactive card message.
    pub async fn send_card(
        &self,
        id_type: ReceiveIdType,
        receive_id: &str,
        card: &Card,
    ) -> Result<SentMessage, ApiError> {
        let content = card.to_value().to_string();
        self.send_message(id_type, receive_id, "interactive", content)
            .await
    }

    /// POST to the message endpoint with the shared envelope handling.
    ///
    /// `content` is the JSON content pre-encoded as a string, which is
    /// how the wire format nests it inside the request body.
    async fn send_message(
        &self,
        id_type: ReceiveIdType,
        receive_id: &str,
        msg_type: &str,
        content: String,
    ) -> Result<SentMessage, ApiError> {
        let token = self.tokens.get_token().await?;
        let url = format!(
            "{}/im/v1/messages?receive_id_type={}",
            self.base_url,
            id_type.as_str()
        );
        let body = serde_json::json!({
            "receive_id": receive_id,
            "msg_type": msg_type,
            "content": content,
        });

        debug!(receive_id, msg_type, "sending message");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ApiError::HttpStatus(resp.status().as_u16()));
        }

        let envelope: ApiEnvelope<SentMessage> = resp.json().await?;
        if envelope.code != 0 {
            return Err(ApiError::Remote {
                code: envelope.code,
                msg: envelope.msg,
            });
        }
        let sent = envelope.data.ok_or(ApiError::Remote {
            code: envelope.code,
            msg: "response envelope has no data".to_owned(),
        })?;

        info!(message_id = %sent.message_id, "message sent");
        Ok(sent)
    }
}

impl std::fmt::Debug for LarkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
