//! HTTP headers as carried in `request-start` / `response-start` bodies.
//!
//! On the wire a header map is a JSON object of lowercase names to either a
//! string or an array of strings (repeated headers such as `set-cookie`).

use std::collections::BTreeMap;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Connection-scoped headers that never cross the tunnel.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
];

/// True for headers that describe a single HTTP hop rather than the message.
pub fn is_hop_by_hop(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "upgrade" || HOP_BY_HOP.contains(&name.as_str())
}

/// One header's value(s).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            HeaderValues::One(v) => std::slice::from_ref(v),
            HeaderValues::Many(vs) => vs,
        };
        slice.iter().map(String::as_str)
    }

    fn to_json(&self) -> Value {
        match self {
            HeaderValues::One(v) => Value::String(v.clone()),
            HeaderValues::Many(vs) => Value::Array(vs.iter().cloned().map(Value::String).collect()),
        }
    }
}

/// Header map in wire form, keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct WireHeaders(BTreeMap<String, HeaderValues>);

impl WireHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect an `http::HeaderMap`. Non-UTF-8 values are converted lossily.
    pub fn from_http(map: &HeaderMap) -> Self {
        let mut out = BTreeMap::new();
        for name in map.keys() {
            let values: Vec<String> = map
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect();
            let entry = match values.len() {
                1 => values.into_iter().next().map(HeaderValues::One),
                _ => Some(HeaderValues::Many(values)),
            };
            if let Some(entry) = entry {
                out.insert(name.as_str().to_owned(), entry);
            }
        }
        Self(out)
    }

    /// Build an `http::HeaderMap`, skipping names or values HTTP rejects.
    pub fn to_http(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, values) in &self.0 {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                tracing::debug!(header = %name, "skipping invalid header name");
                continue;
            };
            for value in values.iter() {
                match HeaderValue::from_str(value) {
                    Ok(v) => {
                        map.append(name.clone(), v);
                    }
                    Err(_) => tracing::debug!(header = %name, "skipping invalid header value"),
                }
            }
        }
        map
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(map)
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValues> {
        self.0.get(&name.to_ascii_lowercase())
    }

    /// Replace any existing value(s) for `name`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .insert(name.to_ascii_lowercase(), HeaderValues::One(value.into()));
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValues> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// Drop connection-scoped headers.
    pub fn strip_hop_by_hop(&mut self) {
        self.0.retain(|name, _| !is_hop_by_hop(name));
    }
}
