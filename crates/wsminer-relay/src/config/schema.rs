use std::net::SocketAddr;

use serde::Deserialize;
use wsminer_core::error::{Result, WsMinerError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    pub version: u32,

    #[serde(default)]
    pub relay: RelaySection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            relay: RelaySection::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WsMinerError::UnsupportedVersion);
        }
        self.relay.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Base URL reported to miners instead of `http://<Host>/`.
    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Longest silence tolerated within one tunneled exchange.
    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,

    #[serde(default = "default_max_buffered_chunks")]
    pub max_buffered_chunks: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            public_url: None,
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            exchange_timeout_ms: default_exchange_timeout_ms(),
            max_buffered_chunks: default_max_buffered_chunks(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl RelaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if let Some(url) = &self.public_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(WsMinerError::BadRequest(
                    "relay.public_url must start with http:// or https://".into(),
                ));
            }
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(WsMinerError::BadRequest(
                "relay.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(WsMinerError::BadRequest(
                "relay.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(WsMinerError::BadRequest(
                "relay.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1000..=600000).contains(&self.exchange_timeout_ms) {
            return Err(WsMinerError::BadRequest(
                "relay.exchange_timeout_ms must be between 1000 and 600000".into(),
            ));
        }
        if !(1..=4096).contains(&self.max_buffered_chunks) {
            return Err(WsMinerError::BadRequest(
                "relay.max_buffered_chunks must be between 1 and 4096".into(),
            ));
        }
        if !(16..=65536).contains(&self.outbound_queue) {
            return Err(WsMinerError::BadRequest(
                "relay.outbound_queue must be between 16 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            WsMinerError::BadRequest(format!("relay.listen must be a valid SocketAddr: {e}"))
        })
    }

    /// Keep the configured interface, replace the port.
    pub fn set_port(&mut self, port: u16) -> Result<()> {
        let mut addr = self.listen_addr()?;
        addr.set_port(port);
        self.listen = addr.to_string();
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:9000".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_exchange_timeout_ms() -> u64 {
    30000
}
fn default_max_buffered_chunks() -> usize {
    64
}
fn default_outbound_queue() -> usize {
    1024
}
