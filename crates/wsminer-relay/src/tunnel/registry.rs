use std::sync::Arc;

use axum::extract::ws::Message as WsMessage;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

use wsminer_core::correlator::Correlator;
use wsminer_core::error::{Result, WsMinerError};
use wsminer_core::protocol::Message;

use super::exchange::ResponseEvent;

/// One accepted tunnel: its id, its socket writer queue and its exchanges.
#[derive(Clone)]
pub struct TunnelConnection {
    id: Arc<str>,
    tx: mpsc::Sender<WsMessage>,
    exchanges: Arc<Correlator<mpsc::Sender<ResponseEvent>>>,
}

impl TunnelConnection {
    pub fn new(id: impl Into<Arc<str>>, tx: mpsc::Sender<WsMessage>) -> Self {
        Self {
            id: id.into(),
            tx,
            exchanges: Arc::new(Correlator::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue one envelope. Each envelope is one WebSocket message, so sends
    /// from concurrent exchanges never interleave within a frame.
    pub async fn send(&self, msg: &Message) -> Result<()> {
        self.tx
            .send(WsMessage::Text(msg.encode()))
            .await
            .map_err(|_| WsMinerError::Transport("tunnel socket closed".into()))
    }

    pub fn exchanges(&self) -> &Correlator<mpsc::Sender<ResponseEvent>> {
        &self.exchanges
    }

    /// Hand a response envelope to the exchange it belongs to.
    ///
    /// Never waits: an exchange whose buffer is full is aborted so one slow
    /// downstream client cannot stall the whole tunnel.
    pub fn route(&self, msg: Message) -> Result<()> {
        let (request_id, event) = match msg {
            Message::ResponseStart { request_id, head } => (request_id, ResponseEvent::Start(head)),
            Message::ResponseData { request_id, chunk } => (request_id, ResponseEvent::Data(chunk)),
            Message::ResponseEnd { request_id } => (request_id, ResponseEvent::End),
            other => {
                return Err(WsMinerError::InvalidMessage(format!(
                    "{} is not routed by the relay",
                    other.message_type().as_str()
                )))
            }
        };

        let Some(tx) = self.exchanges.get(&request_id) else {
            return Err(WsMinerError::UnregisteredSocket(request_id));
        };

        match tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.exchanges.remove(&request_id);
                tracing::warn!(connection_id = %self.id, %request_id, "exchange buffer full, aborting");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                self.exchanges.remove(&request_id);
                Err(WsMinerError::UnregisteredSocket(request_id))
            }
        }
    }
}

/// Connection table: `connectionId -> TunnelConnection`.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, TunnelConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn insert(&self, conn: TunnelConnection) {
        self.connections.insert(conn.id().to_owned(), conn);
    }

    /// Remove a connection together with its exchanges. Dropping the exchange
    /// senders fails every in-flight response on that tunnel.
    pub fn remove(&self, connection_id: &str) -> Option<TunnelConnection> {
        let (_, conn) = self.connections.remove(connection_id)?;
        let orphaned = conn.exchanges().clear();
        if orphaned > 0 {
            tracing::warn!(%connection_id, orphaned, "tunnel closed with exchanges in flight");
        }
        Some(conn)
    }

    pub fn get(&self, connection_id: &str) -> Option<TunnelConnection> {
        self.connections.get(connection_id).map(|r| r.value().clone())
    }

    /// Number of live tunnels.
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn conn(id: &str) -> (TunnelConnection, mpsc::Receiver<WsMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (TunnelConnection::new(id, tx), rx)
    }

    #[tokio::test]
    async fn route_delivers_to_matching_exchange_only() {
        let (c, _rx) = conn("c1");
        let (a_tx, mut a_rx) = mpsc::channel(4);
        let (b_tx, mut b_rx) = mpsc::channel(4);
        c.exchanges().register("a", a_tx).unwrap();
        c.exchanges().register("b", b_tx).unwrap();

        c.route(Message::ResponseData { request_id: "b".into(), chunk: Bytes::from_static(b"for b") })
            .unwrap();

        assert!(a_rx.try_recv().is_err());
        match b_rx.try_recv().unwrap() {
            ResponseEvent::Data(chunk) => assert_eq!(chunk, Bytes::from_static(b"for b")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn route_rejects_unknown_request() {
        let (c, _rx) = conn("c1");
        let err = c.route(Message::ResponseEnd { request_id: "nope".into() }).unwrap_err();
        assert_eq!(err.code().as_str(), "UNREGISTERED_SOCKET");
    }

    #[tokio::test]
    async fn full_exchange_is_aborted() {
        let (c, _rx) = conn("c1");
        let (tx, _keep) = mpsc::channel(1);
        c.exchanges().register("a", tx).unwrap();

        c.route(Message::ResponseEnd { request_id: "a".into() }).unwrap();
        c.route(Message::ResponseEnd { request_id: "a".into() }).unwrap();

        assert!(!c.exchanges().contains("a"));
    }

    #[tokio::test]
    async fn removing_connection_drops_exchanges() {
        let registry = ConnectionRegistry::new();
        let (c, _rx) = conn("c1");
        let (tx, mut ev_rx) = mpsc::channel(4);
        c.exchanges().register("a", tx).unwrap();
        registry.insert(c);

        assert!(registry.get("c1").is_some());
        registry.remove("c1").unwrap();
        assert!(registry.get("c1").is_none());
        assert!(ev_rx.recv().await.is_none());
    }
}
