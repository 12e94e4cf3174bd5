//! One tunneled exchange, replayed against the upstream.
//!
//! Two upstream requests race per exchange:
//! - a `HEAD` probe whose answer becomes `response-start` as soon as it lands
//! - the real request, whose body is piped from `request-data` and whose
//!   response body becomes `response-data`
//!
//! Envelope order on the wire is always start, data..., end: body chunks are
//! forwarded only after the probe has reported, and `response-end` waits for
//! both the upstream body and `request-end`.

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{Method, Response, StatusCode};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use wsminer_core::error::{Result, WsMinerError};
use wsminer_core::protocol::{Message, RequestHead, ResponseHead, WireHeaders};

use super::{carries_body, PipeEnds, UpstreamPipe};
use crate::transport::session::Tunnel;

/// Register the exchange's pipe and spawn its task.
pub(crate) fn start(tunnel: Arc<Tunnel>, request_id: String, head: RequestHead) {
    let (pipe, ends) = UpstreamPipe::open(carries_body(&head.method), tunnel.max_buffered_chunks);
    if let Err(e) = tunnel.streams.register(request_id.clone(), pipe) {
        tracing::warn!(%request_id, error = %e, code = e.code().as_str(), "dropping request-start");
        return;
    }
    tokio::spawn(run(tunnel, request_id, head, ends));
}

async fn run(tunnel: Arc<Tunnel>, request_id: String, head: RequestHead, ends: PipeEnds) {
    let PipeEnds {
        body,
        input_closed,
        aborted,
    } = ends;

    tokio::select! {
        res = replay(&tunnel, &request_id, head, body, input_closed) => {
            if let Err(e) = res {
                tracing::warn!(%request_id, error = %e, code = e.code().as_str(), "exchange failed");
            }
        }
        _ = aborted => {
            tracing::warn!(%request_id, "exchange aborted");
        }
    }

    tunnel.streams.remove(&request_id);
}

async fn replay(
    tunnel: &Tunnel,
    request_id: &str,
    head: RequestHead,
    body: Option<mpsc::Receiver<Bytes>>,
    input_closed: oneshot::Receiver<()>,
) -> Result<()> {
    let idle = tunnel.exchange_timeout;

    let Ok(method) = Method::from_bytes(head.method.as_bytes()) else {
        tracing::warn!(%request_id, method = %head.method, "rejecting invalid method");
        send_start(tunnel, request_id, synthetic_head(StatusCode::BAD_REQUEST)).await?;
        return send_end(tunnel, request_id).await;
    };

    let url = tunnel.upstream.url(&head.url);
    let headers = tunnel.upstream.rewrite_headers(head.headers, body.is_some());
    tracing::debug!(%request_id, %method, %url, "replaying request");

    let mut request = tunnel
        .upstream
        .client()
        .request(method, &url)
        .headers(headers.clone());
    if let Some(rx) = body {
        request = request.body(reqwest::Body::wrap_stream(body_stream(rx)));
    }

    let (_, sent) = tokio::join!(
        probe_head(tunnel, request_id, &url, headers),
        timeout(idle, request.send()),
    );

    match sent {
        Ok(Ok(response)) => forward_body(tunnel, request_id, response).await?,
        // the probe has already reported the failure as `response-start`
        Ok(Err(e)) => tracing::warn!(%request_id, error = %e, "upstream request failed"),
        Err(_) => tracing::warn!(%request_id, "upstream request timed out"),
    }

    match timeout(idle, input_closed).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => {
            return Err(WsMinerError::Transport(
                "request stream dropped before request-end".into(),
            ))
        }
        Err(_) => return Err(WsMinerError::Timeout),
    }

    send_end(tunnel, request_id).await
}

/// `HEAD` the same URL and report the answer as `response-start`.
/// Unreachable upstreams are reported as 502, slow ones as 504.
async fn probe_head(tunnel: &Tunnel, request_id: &str, url: &str, mut headers: HeaderMap) {
    headers.remove(CONTENT_LENGTH);
    let probe = tunnel.upstream.client().head(url).headers(headers).send();

    let head = match timeout(tunnel.exchange_timeout, probe).await {
        Ok(Ok(resp)) => ResponseHead {
            code: resp.status().as_u16(),
            status: resp
                .status()
                .canonical_reason()
                .unwrap_or_default()
                .to_owned(),
            headers: WireHeaders::from_http(resp.headers()),
        },
        Ok(Err(e)) => {
            tracing::warn!(%request_id, error = %e, "upstream probe failed");
            synthetic_head(StatusCode::BAD_GATEWAY)
        }
        Err(_) => {
            tracing::warn!(%request_id, "upstream probe timed out");
            synthetic_head(StatusCode::GATEWAY_TIMEOUT)
        }
    };

    if let Err(e) = send_start(tunnel, request_id, head).await {
        tracing::debug!(%request_id, error = %e, "response-start not sent");
    }
}

async fn forward_body(tunnel: &Tunnel, request_id: &str, response: Response) -> Result<()> {
    let mut chunks = response.bytes_stream();
    loop {
        match timeout(tunnel.exchange_timeout, chunks.next()).await {
            Err(_) => return Err(WsMinerError::Timeout),
            Ok(None) => return Ok(()),
            Ok(Some(Err(e))) => return Err(WsMinerError::Upstream(e.to_string())),
            Ok(Some(Ok(chunk))) => {
                if chunk.is_empty() {
                    continue;
                }
                tunnel
                    .outbound
                    .send(&Message::ResponseData {
                        request_id: request_id.to_owned(),
                        chunk,
                    })
                    .await?;
            }
        }
    }
}

async fn send_start(tunnel: &Tunnel, request_id: &str, head: ResponseHead) -> Result<()> {
    tunnel
        .outbound
        .send(&Message::ResponseStart {
            request_id: request_id.to_owned(),
            head,
        })
        .await
}

async fn send_end(tunnel: &Tunnel, request_id: &str) -> Result<()> {
    tunnel
        .outbound
        .send(&Message::ResponseEnd {
            request_id: request_id.to_owned(),
        })
        .await
}

fn synthetic_head(status: StatusCode) -> ResponseHead {
    ResponseHead {
        code: status.as_u16(),
        status: status.canonical_reason().unwrap_or_default().to_owned(),
        headers: WireHeaders::new(),
    }
}

fn body_stream(mut rx: mpsc::Receiver<Bytes>) -> impl Stream<Item = io::Result<Bytes>> + Send + Sync + 'static {
    futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx).map(|chunk| chunk.map(Ok)))
}
