//! wsminer relay library entry.
//!
//! The relay accepts tunnel WebSockets from miners on `/` and proxies every
//! other path `/<connectionId>/<rest>` through the matching tunnel. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod router;
pub mod transport;
pub mod tunnel;

use tokio::net::TcpListener;

use wsminer_core::error::{Result, WsMinerError};

/// Serve the relay on an already bound listener until the server fails.
pub async fn serve(listener: TcpListener, state: app_state::AppState) -> Result<()> {
    let app = router::build_router(state);
    axum::serve(listener, app)
        .await
        .map_err(|e| WsMinerError::Internal(format!("server failed: {e}")))
}
