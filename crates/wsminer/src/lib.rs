//! Top-level facade crate for wsminer.
//!
//! Re-exports the protocol core, the relay and the miner so users can depend
//! on a single crate.

pub mod core {
    pub use wsminer_core::*;
}

pub mod relay {
    pub use wsminer_relay::*;
}

pub mod client {
    pub use wsminer_client::*;
}
