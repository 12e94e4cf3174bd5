//! Local upstream side of the miner.
//!
//! - `Upstream`: base URL, Host rewriting and the shared HTTP client
//! - `pipe`: per-exchange request body pipe, tracked by `requestId`
//! - `exchange`: one tunneled request replayed against the upstream

pub mod exchange;
pub mod pipe;

use reqwest::header::HeaderMap;
use reqwest::{redirect, Client, Url};

use wsminer_core::error::{Result, WsMinerError};
use wsminer_core::protocol::WireHeaders;

pub use pipe::{PipeEnds, PipeWrite, UpstreamPipe};

/// The local service every tunneled request is replayed against.
#[derive(Clone)]
pub struct Upstream {
    client: Client,
    base: String,
    host: String,
}

impl Upstream {
    pub fn new(base: &str) -> Result<Self> {
        let url = Url::parse(base)
            .map_err(|e| WsMinerError::BadRequest(format!("invalid upstream {base:?}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_owned(),
            (None, _) => {
                return Err(WsMinerError::BadRequest(format!(
                    "upstream {base:?} has no host"
                )))
            }
        };

        // Redirects and compression belong to the public client, not to us.
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| WsMinerError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_owned(),
            host,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// `host[:port]` of the upstream, as sent in the `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Absolute upstream URL for a tunneled path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }

    /// Request headers for the upstream: connection-scoped headers dropped,
    /// `Host` pointed at the upstream. Bodiless requests lose any
    /// `content-length` so the upstream does not wait for bytes that never come.
    pub fn rewrite_headers(&self, mut headers: WireHeaders, with_body: bool) -> HeaderMap {
        headers.strip_hop_by_hop();
        headers.insert("host", self.host.as_str());
        if !with_body {
            headers.remove("content-length");
        }
        headers.to_http()
    }
}

/// Methods whose request body is streamed to the upstream.
pub fn carries_body(method: &str) -> bool {
    !method.eq_ignore_ascii_case("GET") && !method.eq_ignore_ascii_case("HEAD")
}
