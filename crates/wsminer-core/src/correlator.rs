//! Request correlator: `requestId -> in-flight exchange state`.
//!
//! Each side of the tunnel owns one correlator per socket (the relay per
//! connection, the miner per session). Incoming envelopes are routed with a
//! single lookup; entries are removed when their exchange completes, aborts, or
//! the owning socket closes.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{Result, WsMinerError};

pub struct Correlator<T> {
    entries: DashMap<String, T>,
}

impl<T> Default for Correlator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Correlator<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register a new exchange. Ids are never reused while registered.
    pub fn register(&self, request_id: impl Into<String>, entry: T) -> Result<()> {
        match self.entries.entry(request_id.into()) {
            Entry::Occupied(o) => Err(WsMinerError::DuplicateRequest(o.key().clone())),
            Entry::Vacant(v) => {
                v.insert(entry);
                Ok(())
            }
        }
    }

    /// Run `f` on the entry while holding its shard lock.
    /// `f` must not call back into this correlator.
    pub fn with_entry<R>(&self, request_id: &str, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.entries
            .get_mut(request_id)
            .map(|mut entry| f(entry.value_mut()))
    }

    pub fn contains(&self, request_id: &str) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn remove(&self, request_id: &str) -> Option<T> {
        self.entries.remove(request_id).map(|(_, entry)| entry)
    }

    /// Drop every entry (socket closed).
    pub fn clear(&self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// Number of exchanges currently registered.
    pub fn in_flight(&self) -> usize {
        self.entries.len()
    }
}

impl<T: Clone> Correlator<T> {
    pub fn get(&self, request_id: &str) -> Option<T> {
        self.entries.get(request_id).map(|e| e.value().clone())
    }
}
