//! WebSocket adapter between a client connection and a table actor.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{table_id}`
//! 2. The connection registers with the table actor and gets an outbox
//! 3. A send task forwards everything the actor puts in the outbox
//! 4. The receive loop parses client frames and forwards them to the actor
//! 5. On disconnect the actor is told and the send task is stopped
//!
//! The adapter holds no game state; it only translates frames.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/3f9c2a1b');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'state') renderTable(msg.table);
//!   if (msg.type === 'hole_cards') renderHand(msg.cards);
//! };
//!
//! ws.send(JSON.stringify({
//!   type: 'join_table',
//!   player: { id: 'alice', name: 'Alice' },
//! }));
//! ```

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use holdem_engine::{
    messages::ERR_BAD_MESSAGE,
    net::{ClientMessage, ConnectionId, ServerMessage},
    table::{TableHandle, TableMessage},
};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use super::AppState;
use crate::metrics;

/// Messages buffered per connection before the table starts dropping them.
pub const OUTBOX_CAPACITY: usize = 64;

/// Upgrade HTTP connection to WebSocket for real-time table communication.
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// Returns `404 Not Found` for an unknown table.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(table_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some(handle) = state.table_manager.get_table(&table_id).await else {
        return (StatusCode::NOT_FOUND, "Table not found").into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, handle))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, handle: TableHandle) {
    let table_id = handle.table_id().clone();
    let connection_id = ConnectionId::new();
    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMessage>(OUTBOX_CAPACITY);

    if handle
        .send(TableMessage::Connect {
            connection_id,
            outbox: outbox.clone(),
        })
        .await
        .is_err()
    {
        warn!("Table {table_id} closed before connection {connection_id} registered");
        return;
    }

    metrics::websocket_connection_opened();
    info!("WebSocket connected: table={table_id}, connection={connection_id}");

    // Forward the table's messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {message}: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Receive messages from client
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                let parsed = serde_json::from_str::<ClientMessage>(text.as_str())
                    .ok()
                    .and_then(|message| TableMessage::from_client(connection_id, message));
                let Some(message) = parsed else {
                    metrics::bad_messages_total();
                    debug!("Bad message on connection {connection_id}: {}", text.as_str());
                    if outbox.try_send(ServerMessage::error(ERR_BAD_MESSAGE)).is_err() {
                        warn!("Dropped bad_message reply to connection {connection_id}");
                    }
                    continue;
                };

                if handle.send(message).await.is_err() {
                    info!("Table {table_id} closed; dropping connection {connection_id}");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Err(e) => {
                debug!("WebSocket error on connection {connection_id}: {e}");
                break;
            }
            _ => {}
        }
    }

    // The seat, if any, stays; the turn clock plays for it.
    let _ = handle.send(TableMessage::Disconnect { connection_id }).await;
    send_task.abort();
    metrics::websocket_connection_closed();

    info!("WebSocket disconnected: table={table_id}, connection={connection_id}");
}
