//! Message handler registry — sub-dispatch for received messages.
//!
//! Handlers declare interest via `supports()` and are evaluated in
//! descending priority order, registration order within a priority. A
//! handler that processed the message decides whether evaluation
//! continues ([`Outcome::Continue`]) or stops ([`Outcome::Stop`]); an
//! erroring handler is logged and never blocks the handlers behind it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::event::{EventListener, LarkEvent, MessageEvent};

pub mod greeting;

pub use greeting::GreetingHandler;

/// Priority of the default catch-all handler. Low enough that any
/// purpose-built handler registered with the default priority of `0`
/// outranks it.
pub const CATCH_ALL_PRIORITY: i32 = -1000;

/// What a handler that processed a message wants done next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The message is dealt with; skip the remaining handlers.
    Stop,
    /// Let lower-priority handlers see the message too.
    Continue,
}

/// A message processor competing for received messages.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Whether this handler wants the message. Must be cheap; called for
    /// every handler in priority order.
    fn supports(&self, message: &MessageEvent) -> bool;

    /// Process the message. Errors are logged by the registry and do not
    /// stop the dispatch cycle.
    async fn handle(&self, message: &MessageEvent) -> anyhow::Result<Outcome>;

    /// Name used in registry logs.
    fn name(&self) -> &str {
        "handler"
    }
}

struct Registration {
    handler: Arc<dyn MessageHandler>,
    priority: i32,
}

#[derive(Default)]
struct Inner {
    handlers: Vec<Registration>,
    sorted: bool,
}

/// Priority-ordered handler set with sort-on-demand caching.
///
/// The list is re-sorted lazily before a dispatch cycle, only when it
/// changed since the last sort.
#[derive(Default)]
pub struct HandlerRegistry {
    inner: RwLock<Inner>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler with the given priority. Equal priorities keep
    /// registration order.
    pub async fn register(&self, handler: Arc<dyn MessageHandler>, priority: i32) {
        let mut inner = self.inner.write().await;
        debug!(
            handler = handler.name(),
            priority,
            count = inner.handlers.len().saturating_add(1),
            "message handler registered"
        );
        inner.handlers.push(Registration { handler, priority });
        inner.sorted = false;
    }

    /// Number of registered handlers.
    pub async fn len(&self) -> usize {
        self.inner.read().await.handlers.len()
    }

    /// Whether the registry has no handlers.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.handlers.is_empty()
    }

    /// Run one dispatch cycle over the sorted handlers.
    ///
    /// Every handler whose `supports()` returns true is invoked until one
    /// of them returns [`Outcome::Stop`]. Handler errors are logged and
    /// iteration continues. Logs a warning if nothing supported the
    /// message.
    pub async fn handle_message(&self, message: &MessageEvent) {
        let handlers = self.sorted_handlers().await;

        let mut any_supported = false;
        for entry in &handlers {
            if !entry.supports(message) {
                continue;
            }
            any_supported = true;
            match entry.handle(message).await {
                Ok(Outcome::Stop) => {
                    debug!(handler = entry.name(), "handler stopped propagation");
                    return;
                }
                Ok(Outcome::Continue) => {
                    debug!(handler = entry.name(), "handler continued propagation");
                }
                Err(e) => {
                    // Local failure boundary: one broken handler must not
                    // starve the ones behind it.
                    warn!(handler = entry.name(), error = %e, "message handler failed");
                }
            }
        }

        if !any_supported {
            warn!(
                message_id = %message.message.message_id,
                chat_id = %message.message.chat_id,
                "no handler supports message"
            );
        }
    }

    async fn sorted_handlers(&self) -> Vec<Arc<dyn MessageHandler>> {
        let mut inner = self.inner.write().await;
        if !inner.sorted {
            // Stable sort: equal priorities keep registration order.
            inner
                .handlers
                .sort_by_key(|r| std::cmp::Reverse(r.priority));
            inner.sorted = true;
        }
        inner.handlers.iter().map(|r| Arc::clone(&r.handler)).collect()
    }
}

/// Lets the registry subscribe to the dispatcher for message events.
#[async_trait]
impl EventListener for HandlerRegistry {
    async fn on_event(&self, event: &LarkEvent) -> anyhow::Result<()> {
        let Some(message) = MessageEvent::from_event(event) else {
            warn!(
                event_type = %event.event_type,
                "message payload did not deserialize; skipping handler dispatch"
            );
            return Ok(());
        };
        self.handle_message(&message).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "handler_registry"
    }
}
