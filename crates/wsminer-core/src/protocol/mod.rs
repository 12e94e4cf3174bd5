//! Tunnel protocol modules.
//!
//! Two layers share one WebSocket text message per envelope:
//! - Envelope: `<8-digit length><JSON header><body>`, untyped header map.
//! - Message: the typed view, one variant per header `type`.
//!
//! All parsers are panic-free: malformed input is reported as `WsMinerError`
//! and the dispatch loops drop the offending frame.

pub mod envelope;
pub mod headers;
pub mod message;

pub use envelope::{deserialize, serialize, Body, BodyType, Envelope, Header};
pub use headers::{HeaderValues, WireHeaders};
pub use message::{Message, MessageType, RequestHead, ResponseHead};
