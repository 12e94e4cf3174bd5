//! wsminer client ("miner") library entry.
//!
//! The miner keeps one outbound WebSocket to the relay and replays every
//! tunneled request against the local upstream, streaming the response back.

pub mod config;
pub mod transport;
pub mod upstream;

pub use transport::session::MinerSession;
