//! Priority-ordered listener registry and synchronous event dispatch.
//!
//! Listeners subscribe to one [`EventKind`] with an integer priority.
//! Dispatch notifies all listeners of the event's kind, highest priority
//! first, registration order within a priority. A failing listener is
//! logged and never stops the notification loop; dispatch outcome never
//! reaches the HTTP response.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{EventContext, EventKind, LarkEvent};

/// A subscriber notified of events of one [`EventKind`].
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Handle one event. Errors are logged by the dispatcher and do not
    /// affect other listeners or the HTTP response.
    async fn on_event(&self, event: &LarkEvent) -> anyhow::Result<()>;

    /// Name used in dispatch logs.
    fn name(&self) -> &str {
        "listener"
    }
}

struct Registration {
    listener: Arc<dyn EventListener>,
    priority: i32,
}

/// Maps event kinds to their ordered listener lists.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<EventKind, Vec<Registration>>>,
}

impl EventDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for one event kind.
    ///
    /// The kind's list is re-sorted by descending priority on every
    /// change; the sort is stable, so listeners with equal priority keep
    /// their registration order.
    pub async fn add_listener(
        &self,
        kind: EventKind,
        listener: Arc<dyn EventListener>,
        priority: i32,
    ) {
        let mut listeners = self.listeners.write().await;
        let entries = listeners.entry(kind).or_default();
        entries.push(Registration { listener, priority });
        entries.sort_by_key(|r| std::cmp::Reverse(r.priority));
        debug!(?kind, priority, count = entries.len(), "listener registered");
    }

    /// Construct the typed event and notify its subscribers in order.
    ///
    /// Mapping never fails: unknown wire types become
    /// [`EventKind::Generic`]. Listener errors are logged and the loop
    /// continues.
    pub async fn dispatch(&self, event_type: &str, payload: Value, context: EventContext) {
        let event = LarkEvent::new(event_type, payload, context);
        debug!(
            event_type = %event.event_type,
            kind = ?event.kind,
            event_id = %event.context.event_id,
            "dispatching event"
        );

        let listeners = self.listeners.read().await;
        let Some(entries) = listeners.get(&event.kind) else {
            debug!(kind = ?event.kind, "no listeners for event kind");
            return;
        };

        for entry in entries {
            if let Err(e) = entry.listener.on_event(&event).await {
                warn!(
                    listener = entry.listener.name(),
                    event_type = %event.event_type,
                    error = %e,
                    "event listener failed"
                );
            }
        }
    }

    /// Number of listeners registered for a kind (for diagnostics).
    pub async fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .await
            .get(&kind)
            .map_or(0, |entries| entries.len())
    }
}
