//! Tunnel WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS on `/` (plain requests to `/` get 404)
//! - Register the connection and announce its public URL
//! - Route response envelopes to in-flight exchanges by `requestId`
//! - Lifecycle: ping + idle timeout; unregister on close

use axum::{
    extract::{ws::Message as WsMessage, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::{header::HOST, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use wsminer_core::error::Result;
use wsminer_core::ids::fresh_id;
use wsminer_core::protocol::Message;

use crate::app_state::AppState;
use crate::transport::codec::{decode, Inbound};
use crate::tunnel::TunnelConnection;

pub async fn tunnel_upgrade(
    State(app): State<AppState>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    let Some(ws) = ws else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_session(app, host, socket).await {
            tracing::warn!(error = %e, "tunnel session failed");
        }
    })
}

/// Unregisters the connection on every exit path, so the id and the socket
/// never outlive each other.
struct Registration {
    app: AppState,
    connection_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.app.registry().remove(&self.connection_id);
        tracing::info!(
            connection_id = %self.connection_id,
            tunnels = self.app.registry().count(),
            "close connection"
        );
    }
}

async fn run_session(app: AppState, host: Option<String>, socket: WebSocket) -> Result<()> {
    let cfg = app.cfg().relay.clone();
    let connection_id = fresh_id();

    // ---- outbound channel shared by every exchange on this tunnel
    let (out_tx, mut out_rx) = mpsc::channel::<WsMessage>(cfg.outbound_queue);
    let conn = TunnelConnection::new(connection_id.as_str(), out_tx);

    app.registry().insert(conn.clone());
    let _registration = Registration {
        app: app.clone(),
        connection_id: connection_id.clone(),
    };

    let url = app.public_url(host.as_deref(), &connection_id);
    tracing::info!(%connection_id, %url, tunnels = app.registry().count(), "open connection");
    conn.send(&Message::Connection { url }).await?;

    let (mut ws_tx, mut ws_rx) = socket.split();

    let ping_every = Duration::from_millis(cfg.ping_interval_ms);
    let idle_timeout = Duration::from_millis(cfg.idle_timeout_ms);

    let mut ping_tick = tokio::time::interval(ping_every);
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                match maybe_out {
                    Some(m) => {
                        if ws_tx.send(m).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let Some(incoming) = incoming else { break; };
                let Ok(msg) = incoming else { break; };

                last_activity = Instant::now();

                match decode(msg) {
                    Ok(Inbound::Envelope(msg)) => handle_envelope(&conn, msg),
                    Ok(Inbound::Binary { bytes_len }) => {
                        tracing::debug!(%connection_id, bytes_len, "ignoring binary frame");
                    }
                    // control frames bypass the queue: this loop is its only reader
                    Ok(Inbound::Ping(payload)) => {
                        if ws_tx.send(WsMessage::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Inbound::Pong) => {}
                    Ok(Inbound::Close) => break,
                    Err(e) => {
                        tracing::debug!(%connection_id, error = %e, code = e.code().as_str(), "dropping undecodable frame");
                    }
                }
            }

            // ping
            _ = ping_tick.tick() => {
                if ws_tx.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            // idle timeout
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!(%connection_id, "idle timeout");
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_envelope(conn: &TunnelConnection, msg: Message) {
    match msg {
        Message::Open { session_id } => {
            tracing::info!(connection_id = %conn.id(), %session_id, "miner session announced");
        }
        msg @ (Message::ResponseStart { .. }
        | Message::ResponseData { .. }
        | Message::ResponseEnd { .. }) => {
            let msg_type = msg.message_type();
            if let Err(e) = conn.route(msg) {
                tracing::debug!(
                    connection_id = %conn.id(),
                    msg_type = msg_type.as_str(),
                    error = %e,
                    "dropping response envelope"
                );
            }
        }
        other => {
            tracing::debug!(
                connection_id = %conn.id(),
                msg_type = other.message_type().as_str(),
                "ignoring miner-bound message"
            );
        }
    }
}
