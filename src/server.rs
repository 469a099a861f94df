//! WebSocket transport: accepts connections, frames typed JSON messages
//! and hands everything else to the hub.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{event, instrument, Level};

use crate::hub::Hub;
use crate::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Connection parameters carried in the WebSocket target.
pub struct ConnectionTarget {
    pub room_id: String,
    /// Proves master identity when it matches the room's secret.
    pub token: Option<String>,
    /// Re-binds a returning player's seat.
    pub player_id: Option<String>,
}

/// Parses a request target of the form `/rooms/<id>?token=..&playerId=..`.
pub fn parse_target(target: &str) -> Option<ConnectionTarget> {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());

    if segments.next() != Some("rooms") {
        return None;
    }

    let room_id = segments.next()?.to_string();

    if segments.next().is_some() || room_id.is_empty() {
        return None;
    }

    let mut token = None;
    let mut player_id = None;

    for pair in query.unwrap_or_default().split('&') {
        match pair.split_once('=') {
            Some(("token", value)) if !value.is_empty() => token = Some(value.to_string()),
            Some(("playerId", value)) if !value.is_empty() => {
                player_id = Some(value.to_string())
            }
            _ => {}
        }
    }

    Some(ConnectionTarget {
        room_id,
        token,
        player_id,
    })
}

/// Accept loop: one task per incoming connection.
pub async fn serve(listener: TcpListener, hub: Arc<Hub>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(handle_connection(stream, addr, hub.clone()));
            }
            Err(e) => {
                event!(Level::WARN, error = %e, "failed to accept a connection");
            }
        }
    }
}

#[instrument(skip_all, fields(peer = %addr))]
async fn handle_connection(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>) {
    let mut request_target = None;

    let websocket = match accept_hdr_async(stream, |request: &Request, response: Response| {
        request_target = Some(request.uri().to_string());
        Ok(response)
    })
    .await
    {
        Ok(v) => v,
        Err(e) => {
            event!(Level::DEBUG, error = %e, "websocket handshake failed");
            return;
        }
    };

    let (mut sink, mut stream) = websocket.split();

    let Some(target) = request_target.as_deref().and_then(parse_target) else {
        event!(Level::DEBUG, target = ?request_target, "rejecting an unroutable target");
        send_terminal_error(
            &mut sink,
            "NOT_FOUND",
            "connect to /rooms/<roomId> to join a room",
        )
        .await;
        return;
    };

    // Outbound messages flow through a per-connection FIFO queue owned by
    // the writer task, which preserves emission order per recipient.
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn = match hub
        .attach(&target.room_id, target.token, target.player_id, outbound_tx)
        .await
    {
        Ok(conn) => conn,
        Err(e) => {
            event!(Level::DEBUG, error = %e, room_id = %target.room_id, "attach refused");
            send_terminal_error(&mut sink, "NOT_FOUND", &e.to_string()).await;
            return;
        }
    };

    event!(Level::DEBUG, conn_id = conn.id, room_id = %target.room_id, "connection attached");

    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let frame = match serde_json::to_string(&message) {
                Ok(v) => v,
                Err(e) => {
                    event!(Level::ERROR, error = %e, "cannot encode an outbound frame");
                    continue;
                }
            };

            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }

        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => hub.route(&target.room_id, &conn, msg),
                Err(e) => hub.route_malformed(
                    &target.room_id,
                    &conn,
                    format!("malformed message: {}", e),
                ),
            },
            Ok(Message::Binary(_)) => hub.route_malformed(
                &target.room_id,
                &conn,
                "binary frames are not supported".to_string(),
            ),
            Ok(Message::Close(_)) => break,
            // Pings and pongs are answered by the protocol stack.
            Ok(_) => {}
            Err(e) => {
                event!(Level::DEBUG, conn_id = conn.id, error = %e, "read failed");
                break;
            }
        }
    }

    event!(Level::DEBUG, conn_id = conn.id, "connection closed");

    hub.detach(&target.room_id, conn.id);
    drop(conn);

    let _ = writer.await;
}

/// Delivers one error frame to a socket that never made it into a room.
async fn send_terminal_error<S>(sink: &mut S, code: &str, message: &str)
where
    S: SinkExt<Message> + Unpin,
{
    let frame = ServerMessage::Error {
        code: code.to_string(),
        message: message.to_string(),
    };

    if let Ok(text) = serde_json::to_string(&frame) {
        let _ = sink.send(Message::Text(text)).await;
    }

    let _ = sink.close().await;
}
