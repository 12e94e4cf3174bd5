//! Relay-side request context.
//!
//! An `Exchange` ties one public HTTP request to a `requestId` on a tunnel.
//! Response envelopes reach it through the connection's correlator as
//! `ResponseEvent`s; the HTTP response body is streamed straight from them.
//! Dropping the exchange unregisters it, whether it finished, timed out, or
//! the downstream client went away.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, Stream};
use tokio::sync::mpsc;
use tokio::time::timeout;

use wsminer_core::error::{Result, WsMinerError};
use wsminer_core::ids::fresh_id;
use wsminer_core::protocol::ResponseHead;

use super::registry::TunnelConnection;

#[derive(Debug)]
pub enum ResponseEvent {
    Start(ResponseHead),
    Data(Bytes),
    End,
}

pub struct Exchange {
    request_id: String,
    connection: TunnelConnection,
    events: mpsc::Receiver<ResponseEvent>,
    /// Chunks that overtook `response-start`.
    pending: VecDeque<Bytes>,
    ended: bool,
    idle: Duration,
    max_pending: usize,
}

impl Exchange {
    /// Allocate a fresh `requestId` and register it on `connection`.
    pub fn open(connection: TunnelConnection, capacity: usize, idle: Duration) -> Result<Self> {
        let request_id = fresh_id();
        let (tx, events) = mpsc::channel(capacity);
        connection.exchanges().register(request_id.clone(), tx)?;
        Ok(Self {
            request_id,
            connection,
            events,
            pending: VecDeque::new(),
            ended: false,
            idle,
            max_pending: capacity,
        })
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    async fn next_event(&mut self) -> Result<ResponseEvent> {
        timeout(self.idle, self.events.recv())
            .await
            .map_err(|_| WsMinerError::Timeout)?
            .ok_or_else(|| WsMinerError::Transport("tunnel closed mid-exchange".into()))
    }

    /// Wait for `response-start`. Data or end arriving first is kept in order
    /// and replayed once the body is streamed.
    pub async fn wait_head(&mut self) -> Result<ResponseHead> {
        loop {
            match self.next_event().await? {
                ResponseEvent::Start(head) => return Ok(head),
                ResponseEvent::Data(chunk) => {
                    if self.pending.len() >= self.max_pending {
                        return Err(WsMinerError::Upstream(
                            "too many chunks before response-start".into(),
                        ));
                    }
                    self.pending.push_back(chunk);
                }
                ResponseEvent::End => self.ended = true,
            }
        }
    }

    /// Next body chunk; `None` once `response-end` was seen.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        while !self.ended {
            match self.next_event().await? {
                ResponseEvent::Data(chunk) => return Ok(Some(chunk)),
                ResponseEvent::End => self.ended = true,
                ResponseEvent::Start(_) => {
                    tracing::debug!(request_id = %self.request_id, "duplicate response-start ignored");
                }
            }
        }
        Ok(None)
    }

    /// Response body stream. Errors abort the HTTP response.
    pub fn into_body_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        stream::unfold(Some(self), |state| async move {
            let mut exchange = state?;
            match exchange.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(exchange))),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %exchange.connection.id(),
                        request_id = %exchange.request_id,
                        error = %e,
                        "aborting response body"
                    );
                    let kind = match e {
                        WsMinerError::Timeout => io::ErrorKind::TimedOut,
                        _ => io::ErrorKind::ConnectionAborted,
                    };
                    Some((Err(io::Error::new(kind, e.to_string())), None))
                }
            }
        })
    }
}

impl Drop for Exchange {
    fn drop(&mut self) {
        self.connection.exchanges().remove(&self.request_id);
    }
}
