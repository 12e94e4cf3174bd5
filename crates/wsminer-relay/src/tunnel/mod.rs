//! Relay-side tunnel state: live connections and their in-flight exchanges.

mod exchange;
mod registry;

pub use exchange::{Exchange, ResponseEvent};
pub use registry::{ConnectionRegistry, TunnelConnection};
