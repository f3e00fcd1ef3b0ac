//! WebSocket endpoint: one connection id, one outbound channel, one inbound
//! loop feeding the chat service.

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use domain::{ClientEvent, ConnectionId, ServerEvent};

use crate::state::AppState;

pub async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::generate();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    // Attach before reading anything so error replies have somewhere to go.
    state.chat_service.attach(connection_id, event_tx).await;

    info!(%connection_id, "websocket connected");

    let (mut sender, mut incoming) = socket.split();

    // Forwarding task: drains the outbound channel onto the wire. Ends when
    // the sink is unregistered (channel closed) or the socket write fails.
    let send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize outbound event");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = incoming.next().await {
        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => state.chat_service.handle(connection_id, event).await,
                // Unknown or malformed frames are ignored, not fatal.
                Err(err) => debug!(%connection_id, error = %err, "unparseable frame"),
            },
            WsMessage::Close(_) => break,
            // axum answers pings on its own; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    state.chat_service.disconnect(connection_id).await;
    // disconnect dropped the sink, so the forwarder drains and exits.
    let _ = send_task.await;

    info!(%connection_id, "websocket closed");
}
