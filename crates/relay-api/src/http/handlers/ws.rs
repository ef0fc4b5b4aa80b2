//! WebSocket ingress endpoint.
//!
//! `GET /ws` upgrades the request and hands the socket to
//! [`serve_connection`], which registers it with the hub and runs its read
//! and write loops. Each text or binary frame carries one JSON [`Message`];
//! the first frame that fails to decode ends the connection. Ping and pong
//! frames are answered by the transport and never reach the hub.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use relay_core::connection::{serve_connection, FrameReader, FrameWriter};
use relay_types::error::ConnectionError;
use relay_types::message::Message;

use crate::state::AppState;

/// Upgrade an HTTP request to a relay connection.
///
/// A request that is not a valid WebSocket handshake is logged and
/// rejected; nothing is registered with the hub.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "websocket handshake rejected");
            return rejection.into_response();
        }
    };

    ws.on_failed_upgrade(|err| {
        tracing::warn!(error = %err, "websocket upgrade failed");
    })
    .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    serve_connection(state.hub, WsReader { stream }, WsWriter { sink }).await;
}

/// Decodes inbound WebSocket frames into messages.
pub struct WsReader {
    stream: SplitStream<WebSocket>,
}

impl FrameReader for WsReader {
    async fn next_message(&mut self) -> Option<Result<Message, ConnectionError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(err) => return Some(Err(ConnectionError::Transport(err.to_string()))),
            };

            let decoded = match frame {
                ws::Message::Text(text) => serde_json::from_str::<Message>(text.as_str()),
                ws::Message::Binary(bytes) => serde_json::from_slice::<Message>(&bytes),
                ws::Message::Ping(_) | ws::Message::Pong(_) => continue,
                ws::Message::Close(_) => return None,
            };

            return Some(decoded.map_err(|err| ConnectionError::Decode(err.to_string())));
        }
    }
}

/// Encodes outbound messages as JSON text frames.
pub struct WsWriter {
    sink: SplitSink<WebSocket, ws::Message>,
}

impl FrameWriter for WsWriter {
    async fn write(&mut self, msg: &Message) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(msg).map_err(|err| ConnectionError::Transport(err.to_string()))?;
        self.sink
            .send(ws::Message::Text(json.into()))
            .await
            .map_err(|err| ConnectionError::Transport(err.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}
