use chrono::{DateTime, Utc};
use crewdeck_core::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// A live event as delivered to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Wire name of the lifecycle milestone (`crew:start`, `crew:complete`, ...).
    #[serde(rename = "type")]
    pub event: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl ExecutionEvent {
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            event: kind.channel().to_string(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Handle to one connected subscriber. Delivery is a channel send; the
/// receiving side owns the actual transport.
#[derive(Debug)]
pub struct Subscriber {
    pub id: Uuid,
    pub tx: mpsc::UnboundedSender<String>,
}

/// Maps an execution id to the set of subscribers currently interested in it.
///
/// Delivery is best-effort: a slow or dead subscriber never blocks or fails a
/// publish. Events are not buffered for future subscribers.
pub struct EventBus {
    rooms: RwLock<HashMap<Uuid, HashMap<Uuid, Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber for an execution id. Idempotent: re-subscribing
    /// the same subscriber id replaces the previous handle, so each published
    /// event is delivered once. The execution id does not need to exist yet.
    pub async fn subscribe(&self, execution_id: Uuid, subscriber: Subscriber) {
        let subscriber_id = subscriber.id;
        self.rooms
            .write()
            .await
            .entry(execution_id)
            .or_default()
            .insert(subscriber_id, subscriber);
        tracing::debug!(
            execution_id = %execution_id,
            subscriber_id = %subscriber_id,
            "Subscribed to execution"
        );
    }

    /// Remove one registration. No-op if not present.
    pub async fn unsubscribe(&self, execution_id: Uuid, subscriber_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get_mut(&execution_id) {
            room.remove(&subscriber_id);
            if room.is_empty() {
                rooms.remove(&execution_id);
            }
        }
        tracing::debug!(
            execution_id = %execution_id,
            subscriber_id = %subscriber_id,
            "Unsubscribed from execution"
        );
    }

    /// Remove a subscriber from every execution it is registered for.
    /// Used on client disconnect so registrations never leak.
    pub async fn unsubscribe_all(&self, subscriber_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        for room in rooms.values_mut() {
            room.remove(&subscriber_id);
        }
        rooms.retain(|_, room| !room.is_empty());
    }

    /// Deliver an event to every subscriber currently registered for the
    /// execution id. Returns once delivery has been attempted to all of them;
    /// per-subscriber failures (closed channels) are dropped and the sender is
    /// pruned. Silent no-op when nobody is subscribed.
    pub async fn publish(&self, execution_id: Uuid, kind: EventKind, data: serde_json::Value) {
        let event = ExecutionEvent::new(kind, data);
        let payload = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize event");
                return;
            }
        };

        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(&execution_id) else {
            return;
        };

        room.retain(|subscriber_id, subscriber| {
            match subscriber.tx.send(payload.clone()) {
                Ok(()) => true,
                Err(_) => {
                    tracing::debug!(
                        subscriber_id = %subscriber_id,
                        "Dropping dead subscriber"
                    );
                    false
                }
            }
        });
        let delivered = room.len();
        if room.is_empty() {
            rooms.remove(&execution_id);
        }

        tracing::debug!(
            execution_id = %execution_id,
            event = %event.event,
            subscribers = delivered,
            "Event published"
        );
    }

    /// Number of live subscribers for an execution id.
    pub async fn subscriber_count(&self, execution_id: Uuid) -> usize {
        self.rooms
            .read()
            .await
            .get(&execution_id)
            .map_or(0, HashMap::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
