use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use wsminer_core::error::{Result, WsMinerError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinerConfig {
    pub version: u32,

    #[serde(default)]
    pub miner: MinerSection,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            miner: MinerSection::default(),
        }
    }
}

impl MinerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(WsMinerError::UnsupportedVersion);
        }
        self.miner.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinerSection {
    /// Local service, e.g. `http://localhost:3000`.
    #[serde(default)]
    pub upstream: Option<String>,

    /// Relay tunnel endpoint, e.g. `ws://relay.example.com:9000`.
    #[serde(default)]
    pub downstream: Option<String>,

    #[serde(default = "default_exchange_timeout_ms")]
    pub exchange_timeout_ms: u64,

    #[serde(default = "default_max_buffered_chunks")]
    pub max_buffered_chunks: usize,

    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for MinerSection {
    fn default() -> Self {
        Self {
            upstream: None,
            downstream: None,
            exchange_timeout_ms: default_exchange_timeout_ms(),
            max_buffered_chunks: default_max_buffered_chunks(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl MinerSection {
    /// Range and URL-shape checks. Presence is checked by [`Self::settings`].
    pub fn validate(&self) -> Result<()> {
        if let Some(upstream) = &self.upstream {
            check_scheme("miner.upstream", upstream, &["http", "https"])?;
        }
        if let Some(downstream) = &self.downstream {
            check_scheme("miner.downstream", downstream, &["ws", "wss"])?;
        }
        if !(1000..=600000).contains(&self.exchange_timeout_ms) {
            return Err(WsMinerError::BadRequest(
                "miner.exchange_timeout_ms must be between 1000 and 600000".into(),
            ));
        }
        if !(1..=4096).contains(&self.max_buffered_chunks) {
            return Err(WsMinerError::BadRequest(
                "miner.max_buffered_chunks must be between 1 and 4096".into(),
            ));
        }
        if !(16..=65536).contains(&self.outbound_queue) {
            return Err(WsMinerError::BadRequest(
                "miner.outbound_queue must be between 16 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> Result<MinerSettings> {
        let upstream = self
            .upstream
            .clone()
            .ok_or_else(|| WsMinerError::BadRequest("--upstream is required".into()))?;
        let downstream = self
            .downstream
            .clone()
            .ok_or_else(|| WsMinerError::BadRequest("--downstream is required".into()))?;
        Ok(MinerSettings {
            upstream,
            downstream,
            exchange_timeout: Duration::from_millis(self.exchange_timeout_ms),
            max_buffered_chunks: self.max_buffered_chunks,
            outbound_queue: self.outbound_queue,
        })
    }
}

/// Fully resolved miner settings.
#[derive(Debug, Clone)]
pub struct MinerSettings {
    pub upstream: String,
    pub downstream: String,
    pub exchange_timeout: Duration,
    pub max_buffered_chunks: usize,
    pub outbound_queue: usize,
}

impl MinerSettings {
    pub fn new(upstream: impl Into<String>, downstream: impl Into<String>) -> Self {
        let defaults = MinerSection::default();
        Self {
            upstream: upstream.into(),
            downstream: downstream.into(),
            exchange_timeout: Duration::from_millis(defaults.exchange_timeout_ms),
            max_buffered_chunks: defaults.max_buffered_chunks,
            outbound_queue: defaults.outbound_queue,
        }
    }
}

fn check_scheme(field: &str, raw: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| WsMinerError::BadRequest(format!("{field} is not a valid url: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(WsMinerError::BadRequest(format!(
            "{field} must use one of {schemes:?}, got {}",
            url.scheme()
        )));
    }
    Ok(())
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
