//! wsminer relay
//!
//! - Tunnel endpoint: WebSocket upgrade on `/`
//! - Public endpoint: `/<connectionId>/<rest>` proxied through the tunnel
//! - Unknown connection ids answer 404

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use wsminer_core::error::{Result, WsMinerError};
use wsminer_relay::{app_state::AppState, config};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = config::Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, code = e.code().as_str(), "wsminer-relay failed");
        std::process::exit(1);
    }
}

async fn run(args: config::Args) -> Result<()> {
    let cfg = config::resolve(&args)?;
    let listen = cfg.relay.listen_addr()?;

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| WsMinerError::Internal(format!("failed to bind {listen}: {e}")))?;

    tracing::info!(%listen, "wsminer-relay starting");
    wsminer_relay::serve(listener, AppState::new(cfg)).await
}
