//! Shared application state for the relay.
//!
//! One `AppState` owns the connection table; every handler reaches tunnels
//! through it rather than through process-wide maps.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::tunnel::ConnectionRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<ConnectionRegistry>,
}

struct AppStateInner {
    cfg: RelayConfig,
}

impl AppState {
    pub fn new(cfg: RelayConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg }),
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub fn cfg(&self) -> &RelayConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Public base URL for one tunnel, e.g. `http://host:9000/abc123/`.
    pub fn public_url(&self, host: Option<&str>, connection_id: &str) -> String {
        let base = match &self.inner.cfg.relay.public_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://{}", host.unwrap_or("localhost")),
        };
        format!("{base}/{connection_id}/")
    }
}
