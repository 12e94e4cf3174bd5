//! Miner session: one outbound WebSocket to the relay.
//!
//! Responsibilities:
//! - Connect (fail fast) and announce the session with `open`
//! - Publish the tunnel's public URL from `connection`
//! - Route request envelopes to exchanges by `requestId`
//! - Abort every in-flight exchange when the socket closes

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wsminer_core::correlator::Correlator;
use wsminer_core::error::{Result, WsMinerError};
use wsminer_core::ids::fresh_id;
use wsminer_core::protocol::Message;

use crate::config::MinerSettings;
use crate::transport::codec::{decode, Inbound};
use crate::upstream::{exchange, PipeWrite, Upstream, UpstreamPipe};

type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Writer queue of the relay socket, shared by every exchange.
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::Sender<WsMessage>,
}

impl Outbound {
    /// Queue one envelope as one WebSocket text message.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        self.tx
            .send(WsMessage::Text(msg.encode()))
            .await
            .map_err(|_| WsMinerError::Transport("relay socket closed".into()))
    }
}

/// State shared between the dispatch loop and exchange tasks.
pub(crate) struct Tunnel {
    pub(crate) upstream: Upstream,
    pub(crate) streams: Correlator<UpstreamPipe>,
    pub(crate) outbound: Outbound,
    pub(crate) exchange_timeout: Duration,
    pub(crate) max_buffered_chunks: usize,
}

pub struct MinerSession {
    settings: MinerSettings,
    upstream: Upstream,
    session_id: String,
    socket: RelaySocket,
    public_url: watch::Sender<Option<String>>,
}

impl MinerSession {
    /// Open the relay socket. Handshake failures are returned, not retried.
    pub async fn connect(settings: MinerSettings) -> Result<Self> {
        let upstream = Upstream::new(&settings.upstream)?;
        let (socket, _) = connect_async(settings.downstream.as_str())
            .await
            .map_err(|e| {
                WsMinerError::Transport(format!("connect to {} failed: {e}", settings.downstream))
            })?;

        let session_id = fresh_id();
        tracing::info!(
            %session_id,
            downstream = %settings.downstream,
            upstream = %settings.upstream,
            "connected to relay"
        );

        let (public_url, _) = watch::channel(None);
        Ok(Self {
            settings,
            upstream,
            session_id,
            socket,
            public_url,
        })
    }

    /// Public URL announced by the relay; `None` until `connection` arrives.
    pub fn public_url(&self) -> watch::Receiver<Option<String>> {
        self.public_url.subscribe()
    }

    /// Serve the tunnel until the relay socket closes.
    pub async fn run(self) -> Result<()> {
        let MinerSession {
            settings,
            upstream,
            session_id,
            socket,
            public_url,
        } = self;

        let (out_tx, mut out_rx) = mpsc::channel::<WsMessage>(settings.outbound_queue);
        let tunnel = Arc::new(Tunnel {
            upstream,
            streams: Correlator::new(),
            outbound: Outbound { tx: out_tx },
            exchange_timeout: settings.exchange_timeout,
            max_buffered_chunks: settings.max_buffered_chunks,
        });

        let (mut ws_tx, mut ws_rx) = socket.split();

        tunnel
            .outbound
            .send(&Message::Open {
                session_id: session_id.clone(),
            })
            .await?;

        let result = loop {
            tokio::select! {
                // outbound writer
                maybe_out = out_rx.recv() => {
                    let Some(m) = maybe_out else { break Ok(()); };
                    if let Err(e) = ws_tx.send(m).await {
                        break Err(WsMinerError::Transport(e.to_string()));
                    }
                }

                // inbound reader
                incoming = ws_rx.next() => {
                    let msg = match incoming {
                        None => break Ok(()),
                        Some(Err(e)) => break Err(WsMinerError::Transport(e.to_string())),
                        Some(Ok(msg)) => msg,
                    };

                    match decode(msg) {
                        Ok(Inbound::Envelope(msg)) => dispatch(&tunnel, &public_url, msg),
                        Ok(Inbound::Binary { bytes_len }) => {
                            tracing::debug!(%session_id, bytes_len, "ignoring binary frame");
                        }
                        // tungstenite queues the pong itself
                        Ok(Inbound::Ping(_)) | Ok(Inbound::Pong) => {}
                        Ok(Inbound::Close) => break Ok(()),
                        Err(e) => {
                            tracing::debug!(%session_id, error = %e, code = e.code().as_str(), "dropping undecodable frame");
                        }
                    }
                }
            }
        };

        let aborted = tunnel.streams.clear();
        if aborted > 0 {
            tracing::warn!(%session_id, aborted, "relay closed with exchanges in flight");
        }
        tracing::info!(%session_id, "relay connection closed");
        result
    }
}

fn dispatch(tunnel: &Arc<Tunnel>, public_url: &watch::Sender<Option<String>>, msg: Message) {
    match msg {
        Message::Connection { url } => {
            tracing::info!(%url, "tunnel open");
            public_url.send_replace(Some(url));
        }
        Message::RequestStart { request_id, head } => {
            exchange::start(Arc::clone(tunnel), request_id, head);
        }
        Message::RequestData { request_id, chunk } => {
            match tunnel.streams.with_entry(&request_id, |pipe| pipe.write(chunk)) {
                Some(PipeWrite::Written) => {}
                Some(PipeWrite::NotWritable) => {
                    tracing::debug!(%request_id, "dropping body chunk for a closed request body");
                }
                Some(PipeWrite::Overflow) => {
                    tunnel.streams.remove(&request_id);
                    tracing::warn!(%request_id, "request body buffer full, aborting");
                }
                None => unregistered(request_id),
            }
        }
        Message::RequestEnd { request_id } => {
            if tunnel
                .streams
                .with_entry(&request_id, UpstreamPipe::close)
                .is_none()
            {
                unregistered(request_id);
            }
        }
        other => {
            tracing::debug!(
                msg_type = other.message_type().as_str(),
                "ignoring relay-bound message"
            );
        }
    }
}

fn unregistered(request_id: String) {
    let e = WsMinerError::UnregisteredStream(request_id);
    tracing::debug!(error = %e, code = e.code().as_str(), "dropping request envelope");
}
