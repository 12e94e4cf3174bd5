//! Relay config: CLI flags over an optional strict YAML file.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use wsminer_core::error::{Result, WsMinerError};

pub use schema::{RelayConfig, RelaySection};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Expose local HTTP services through WebSocket tunnels", long_about = None)]
pub struct Args {
    /// Port to listen on for tunnel WebSockets and public HTTP traffic
    #[arg(long = "port", short = 'p')]
    pub port: Option<u16>,

    /// Optional YAML config file
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
}

pub fn load_from_file(path: &Path) -> Result<RelayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WsMinerError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<RelayConfig> {
    let cfg: RelayConfig = serde_yaml::from_str(s)
        .map_err(|e| WsMinerError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Merge CLI flags over the config file. `--port` is required without a file.
pub fn resolve(args: &Args) -> Result<RelayConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_from_file(path)?,
        None if args.port.is_none() => {
            return Err(WsMinerError::BadRequest(
                "--port is required when no config file is given".into(),
            ))
        }
        None => RelayConfig::default(),
    };

    if let Some(port) = args.port {
        cfg.relay.set_port(port)?;
    }
    cfg.validate()?;
    Ok(cfg)
}
