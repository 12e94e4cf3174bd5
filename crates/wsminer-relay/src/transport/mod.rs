//! Transport layer.
//!
//! Exposes the tunnel WebSocket handler, the public HTTP ingress handler, and
//! the codec that decodes socket messages once before they are routed.

pub mod codec;
pub mod ingress;
pub mod ws;
