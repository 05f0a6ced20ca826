//! Typed view over `im.message.receive_v1` payloads.
//!
//! The dispatcher carries the raw payload; message handlers deserialize
//! it into [`MessageEvent`] to get at the sender, chat, and content
//! fields without poking through `serde_json::Value` by hand.

use serde::Deserialize;

use super::{EventKind, LarkEvent};

/// Body of a received-message event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    /// Who sent the message.
    pub sender: Sender,
    /// The message itself.
    pub message: MessageBody,
}

impl MessageEvent {
    /// Deserialize a [`LarkEvent`] of kind [`EventKind::Message`].
    ///
    /// Returns `None` for other kinds or payloads missing the required
    /// fields.
    pub fn from_event(event: &LarkEvent) -> Option<Self> {
        if event.kind != EventKind::Message {
            return None;
        }
        serde_json::from_value(event.payload.clone()).ok()
    }

    /// Whether the message arrived in a private (p2p) chat.
    pub fn is_private(&self) -> bool {
        self.message.chat_type == "p2p"
    }

    /// Whether the bot was @-mentioned in the message.
    pub fn mentions_bot(&self) -> bool {
        self.message
            .mentions
            .as_ref()
            .is_some_and(|m| !m.is_empty())
    }

    /// Extract the plain text of a `text` message, if that is what this is.
    ///
    /// The wire `content` field is a JSON string like `{"text":"hi"}`.
    pub fn text(&self) -> Option<String> {
        if self.message.message_type != "text" {
            return None;
        }
        let content: serde_json::Value = serde_json::from_str(&self.message.content).ok()?;
        content
            .get("text")
            .and_then(|t| t.as_str())
            .map(|t| t.to_owned())
    }
}

/// Sender identity of a message event.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    /// Identifiers for the sending user.
    pub sender_id: SenderId,
    /// Sender type, e.g. `"user"`.
    #[serde(default)]
    pub sender_type: String,
}

/// The identifier set Lark attaches to a sender.
#[derive(Debug, Clone, Deserialize)]
pub struct SenderId {
    /// Open ID, the per-app user identifier.
    #[serde(default)]
    pub open_id: String,
    /// Union ID, stable across apps of one developer.
    #[serde(default)]
    pub union_id: String,
    /// Tenant-scoped user ID, if visible to the app.
    #[serde(default)]
    pub user_id: String,
}

/// Message details of a received-message event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    /// Message ID, used for replies and reactions.
    pub message_id: String,
    /// Chat the message was posted in.
    pub chat_id: String,
    /// `"p2p"` for private chats, `"group"` for group chats.
    pub chat_type: String,
    /// Wire content type: `"text"`, `"image"`, `"post"`, …
    pub message_type: String,
    /// JSON-encoded content, shape depends on `message_type`.
    pub content: String,
    /// Users (including the bot) mentioned in the message.
    #[serde(default)]
    pub mentions: Option<Vec<Mention>>,
}

/// A single @-mention inside a message.
#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    /// Placeholder key in the message text, e.g. `"@_user_1"`.
    #[serde(default)]
    pub key: String,
    /// Display name of the mentioned user or bot.
    #[serde(default)]
    pub name: String,
}
