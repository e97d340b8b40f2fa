use crate::router::handle_client_message;
use crate::routes;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use crewdeck_events::EventBus;
use crewdeck_orchestrator::Orchestrator;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub bus: Arc<EventBus>,
}

/// The main gateway server.
pub struct GatewayServer;

impl GatewayServer {
    pub fn build(orchestrator: Arc<Orchestrator>, bus: Arc<EventBus>) -> Router {
        let state = Arc::new(AppState { orchestrator, bus });

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/executions", post(routes::execute))
            .route("/executions/{id}", get(routes::get_execution))
            .route("/executions/{id}/trace", get(routes::list_trace))
            .route("/executions/{id}/metrics", get(routes::list_metrics))
            .with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    serde_json::json!({"status": "ok", "service": "crewdeck"}).to_string()
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    use futures_util::StreamExt;
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel carrying both event fan-out and control replies to this client
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    info!(connection_id = %connection_id, "WebSocket connected");

    let welcome = serde_json::json!({
        "type": "connected",
        "connection_id": connection_id,
    });
    let _ = tx.send(welcome.to_string());

    // Task: forward messages from channel to WebSocket
    use axum::extract::ws::Message as WsMessage;
    use futures_util::SinkExt;
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(WsMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Task: receive subscribe/unsubscribe messages from the client
    let bus = state.bus.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_message(&bus, connection_id, &tx, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.bus.unsubscribe_all(connection_id).await;
    info!(connection_id = %connection_id, "WebSocket disconnected");
}
