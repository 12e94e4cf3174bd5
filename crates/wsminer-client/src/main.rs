//! wsminer client
//!
//! - Connects out to the relay (`--downstream`), fails fast on handshake error
//! - Replays tunneled requests against `--upstream`

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use wsminer_client::{config, MinerSession};
use wsminer_core::error::Result;

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = config::Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!(error = %e, code = e.code().as_str(), "wsminer failed");
        std::process::exit(1);
    }
}

async fn run(args: config::Args) -> Result<()> {
    let settings = config::resolve(&args)?;
    let session = MinerSession::connect(settings).await?;
    session.run().await
}
