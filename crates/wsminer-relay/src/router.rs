//! Axum router wiring.
//!
//! `/` is the tunnel WebSocket endpoint; every other path goes through the
//! public ingress handler.

use axum::{routing::any, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(transport::ws::tunnel_upgrade))
        .fallback(transport::ingress::ingress)
        .with_state(state)
}
