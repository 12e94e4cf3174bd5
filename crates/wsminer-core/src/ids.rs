//! Opaque identifiers for connections, requests and miner sessions.

use uuid::Uuid;

/// Fresh random identifier, URL-safe (32 lowercase hex chars).
pub fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}
