use crewdeck_events::{EventBus, Subscriber};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Messages a connected client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe:execution")]
    Subscribe { execution_id: Uuid },
    #[serde(rename = "unsubscribe:execution")]
    Unsubscribe { execution_id: Uuid },
}

/// Handle one inbound text frame from a client connection.
///
/// Acks (`subscribed` / `unsubscribed`) and errors go back through the same
/// channel that carries event fan-out, so the client sees a single ordered
/// stream.
pub async fn handle_client_message(
    bus: &EventBus,
    connection_id: Uuid,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { execution_id }) => {
            bus.subscribe(
                execution_id,
                Subscriber {
                    id: connection_id,
                    tx: tx.clone(),
                },
            )
            .await;
            info!(
                connection_id = %connection_id,
                execution_id = %execution_id,
                "Client subscribed to execution"
            );
            let _ = tx.send(
                serde_json::json!({"type": "subscribed", "execution_id": execution_id})
                    .to_string(),
            );
        }
        Ok(ClientMessage::Unsubscribe { execution_id }) => {
            bus.unsubscribe(execution_id, connection_id).await;
            info!(
                connection_id = %connection_id,
                execution_id = %execution_id,
                "Client unsubscribed from execution"
            );
            let _ = tx.send(
                serde_json::json!({"type": "unsubscribed", "execution_id": execution_id})
                    .to_string(),
            );
        }
        Err(e) => {
            warn!(connection_id = %connection_id, error = %e, "Unrecognized client message");
            let _ = tx.send(
                serde_json::json!({"type": "error", "message": format!("Unrecognized message: {e}")})
                    .to_string(),
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_message_parses() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type": "subscribe:execution", "execution_id": "{id}"}}"#);
        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        assert!(matches!(msg, ClientMessage::Subscribe { execution_id } if execution_id == id));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = r#"{"type": "subscribe:everything"}"#;
        assert!(serde_json::from_str::<ClientMessage>(raw).is_err());
    }

    #[tokio::test]
    async fn test_bad_message_gets_error_reply() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_client_message(&bus, Uuid::new_v4(), &tx, "not json").await;
        let reply: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(reply["type"], "error");
    }

    #[tokio::test]
    async fn test_subscribe_registers_and_acks() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        let execution_id = Uuid::new_v4();
        let raw = format!(r#"{{"type": "subscribe:execution", "execution_id": "{execution_id}"}}"#);

        handle_client_message(&bus, connection_id, &tx, &raw).await;
        assert_eq!(bus.subscriber_count(execution_id).await, 1);
        let ack: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(ack["type"], "subscribed");
    }
}
