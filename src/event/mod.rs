//! Typed inbound events and the listener dispatch machinery.
//!
//! Wire event-type strings map to a closed set of variants through
//! [`EventKind::from_wire`]; unknown types deterministically become
//! [`EventKind::Generic`] rather than being resolved dynamically.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod dispatcher;
pub mod message;

pub use dispatcher::{EventDispatcher, EventListener};
pub use message::MessageEvent;

/// Wire type published by the endpoint before echoing a URL-verification
/// challenge. Dispatched as a [`EventKind::Generic`] event.
pub const URL_VERIFICATION_EVENT: &str = "url_verification";

/// Routing context carried by every event, taken from the callback header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    /// Unique identifier of the callback delivery.
    pub event_id: String,
    /// Tenant (customer organisation) the event originated from.
    pub tenant_key: String,
    /// Application the event was delivered to.
    pub app_id: String,
}

/// Closed set of event variants listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A message was received by the bot.
    Message,
    /// A reaction was added to a message.
    MessageReaction,
    /// A user record changed (created, updated, deleted).
    User,
    /// A group chat changed (updated, disbanded).
    Group,
    /// Group membership changed (user added or removed).
    GroupMember,
    /// A bot menu entry was clicked.
    Menu,
    /// Any event type without a dedicated variant.
    Generic,
}

impl EventKind {
    /// Map a wire event-type string to its variant.
    ///
    /// The table is closed and built at compile time; anything unlisted
    /// falls back to [`EventKind::Generic`].
    pub fn from_wire(event_type: &str) -> Self {
        match event_type {
            "im.message.receive_v1" => EventKind::Message,
            "im.message.reaction.created_v1" | "im.message.reaction.deleted_v1" => {
                EventKind::MessageReaction
            }
            "contact.user.created_v3" | "contact.user.updated_v3" | "contact.user.deleted_v3" => {
                EventKind::User
            }
            "im.chat.updated_v1" | "im.chat.disbanded_v1" => EventKind::Group,
            "im.chat.member.user.added_v1" | "im.chat.member.user.deleted_v1" => {
                EventKind::GroupMember
            }
            "application.bot.menu_v6" => EventKind::Menu,
            _ => EventKind::Generic,
        }
    }
}

/// A typed inbound event, immutable after construction.
///
/// Built once per callback and consumed synchronously by listeners within
/// the same request, then discarded. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct LarkEvent {
    /// Variant resolved from the wire type.
    pub kind: EventKind,
    /// Original wire event-type string.
    pub event_type: String,
    /// Raw event body as delivered.
    pub payload: Value,
    /// Routing context from the callback header.
    pub context: EventContext,
}

impl LarkEvent {
    /// Construct an event from wire data. Never fails: unknown types map
    /// to [`EventKind::Generic`] and malformed payloads are carried as-is.
    pub fn new(event_type: impl Into<String>, payload: Value, context: EventContext) -> Self {
        let event_type = event_type.into();
        Self {
            kind: EventKind::from_wire(&event_type),
            event_type,
            payload,
            context,
        }
    }
}
