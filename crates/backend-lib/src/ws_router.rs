// ============================
// crates/backend-lib/src/ws_router.rs
// ============================
//! WebSocket router and connection handling.
//!
//! One task pair per connection: a forward task draining the
//! coordinator's outbound channel into the socket, and the read loop
//! below feeding inbound frames to the coordinator. Frames that fail to
//! parse are dropped without a reply; the protocol has no error channel
//! and a broken client must not be able to make the server chatty.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tracing::{debug, info, warn};
use uuid::Uuid;
use watchparty_common::{ClientEvent, ConnectionId};

use crate::metrics as keys;
use crate::AppState;

/// Create the WebSocket router
pub fn create_router(state: AppState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    counter!(keys::WS_CONNECTION).increment(1);
    gauge!(keys::WS_ACTIVE).increment(1.0);
    info!(connection = %connection_id, "websocket connected");

    let (mut sink, mut stream) = socket.split();
    let mut outbound = state.coordinator.register(connection_id);

    // Forward coordinator events to the socket until either side closes.
    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(%err, "failed to serialize outbound event");
                    continue;
                },
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    counter!(keys::WS_EVENT).increment(1);
                    state.coordinator.handle_event(connection_id, event);
                },
                Err(err) => {
                    counter!(keys::WS_MALFORMED).increment(1);
                    debug!(connection = %connection_id, %err, "dropping malformed frame");
                },
            },
            Message::Close(_) => break,
            // pings are answered by axum itself
            _ => {},
        }
    }

    state.coordinator.disconnect(connection_id);
    gauge!(keys::WS_ACTIVE).decrement(1.0);
    info!(connection = %connection_id, "websocket disconnected");

    send_task.abort();
}
