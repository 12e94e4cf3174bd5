//! wsminer core: transport-agnostic tunnel protocol primitives.
//!
//! This crate defines the wire format shared by the relay and the miner: the
//! length-prefixed envelope codec, the typed tunnel messages carried inside it,
//! and the request correlator both sides use to multiplex many HTTP exchanges
//! over one WebSocket. It carries no transport or runtime dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every malformed
//! frame surfaces as a `WsMinerError` so a single bad message can never take a
//! tunnel down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod correlator;
pub mod error;
pub mod ids;
pub mod protocol;

/// Shared result type.
pub use error::{Result, WsMinerError};
