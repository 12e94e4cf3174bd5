//! Miner config: CLI flags over an optional strict YAML file.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use wsminer_core::error::{Result, WsMinerError};

pub use schema::{MinerConfig, MinerSection, MinerSettings};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Expose a local HTTP service through a wsminer relay", long_about = None)]
pub struct Args {
    /// Remote relay address to expose at (ws:// or wss://)
    #[arg(long = "downstream", short = 'd')]
    pub downstream: Option<String>,

    /// Local address to expose (http:// or https://)
    #[arg(long = "upstream", short = 'u')]
    pub upstream: Option<String>,

    /// Optional YAML config file
    #[arg(long = "config", short = 'c')]
    pub config: Option<PathBuf>,
}

pub fn load_from_file(path: &Path) -> Result<MinerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| WsMinerError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MinerConfig> {
    let cfg: MinerConfig = serde_yaml::from_str(s)
        .map_err(|e| WsMinerError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Merge CLI flags over the config file and require both endpoints.
pub fn resolve(args: &Args) -> Result<MinerSettings> {
    let mut cfg = match &args.config {
        Some(path) => load_from_file(path)?,
        None => MinerConfig::default(),
    };
    if let Some(upstream) = &args.upstream {
        cfg.miner.upstream = Some(upstream.clone());
    }
    if let Some(downstream) = &args.downstream {
        cfg.miner.downstream = Some(downstream.clone());
    }
    cfg.validate()?;
    cfg.miner.settings()
}
