//! Public HTTP ingress.
//!
//! Every request on `/<connectionId>/<rest>` becomes one tunneled exchange:
//! `request-start`, then `request-data` per body chunk in arrival order, then
//! `request-end`. The response is written from the exchange's
//! `response-start` / `response-data` / `response-end` events.

use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use wsminer_core::error::{ErrorCode, Result, WsMinerError};
use wsminer_core::protocol::{Message, RequestHead, ResponseHead, WireHeaders};

use crate::app_state::AppState;
use crate::tunnel::{Exchange, TunnelConnection};

/// Connection id and the path to replay upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelTarget {
    pub connection_id: String,
    /// Path and query with the connection prefix stripped.
    pub upstream_path: String,
}

impl TunnelTarget {
    pub fn parse(uri: &Uri) -> Option<Self> {
        let path = uri.path().trim_start_matches('/');
        let (connection_id, rest) = match path.find('/') {
            Some(i) => path.split_at(i),
            None => (path, ""),
        };
        if connection_id.is_empty() {
            return None;
        }

        let mut upstream_path = if rest.is_empty() { "/".to_owned() } else { rest.to_owned() };
        if let Some(query) = uri.query() {
            upstream_path.push('?');
            upstream_path.push_str(query);
        }

        Some(Self {
            connection_id: connection_id.to_owned(),
            upstream_path,
        })
    }
}

pub async fn ingress(State(app): State<AppState>, req: Request) -> Response {
    let method = req.method().clone();
    let Some(target) = TunnelTarget::parse(req.uri()) else {
        return not_found();
    };
    let Some(conn) = app.registry().get(&target.connection_id) else {
        tracing::debug!(%method, connection_id = %target.connection_id, "unknown connection");
        return not_found();
    };

    match forward(&app, conn, target, req).await {
        Ok(resp) => resp,
        Err(e) => error_response(&e),
    }
}

async fn forward(
    app: &AppState,
    conn: TunnelConnection,
    target: TunnelTarget,
    req: Request,
) -> Result<Response> {
    let cfg = &app.cfg().relay;
    let mut exchange = Exchange::open(
        conn.clone(),
        cfg.max_buffered_chunks,
        Duration::from_millis(cfg.exchange_timeout_ms),
    )?;
    let request_id = exchange.request_id().to_owned();

    let (parts, body) = req.into_parts();
    tracing::info!(
        method = %parts.method,
        path = %target.upstream_path,
        connection_id = %target.connection_id,
        %request_id,
        in_flight = conn.exchanges().in_flight(),
        "tunneling request"
    );

    let head = RequestHead {
        url: target.upstream_path,
        method: parts.method.to_string(),
        headers: WireHeaders::from_http(&parts.headers),
    };
    conn.send(&Message::RequestStart {
        request_id: request_id.clone(),
        head,
    })
    .await?;

    tokio::spawn(pump_request_body(conn, request_id, body));

    let head = exchange.wait_head().await?;
    build_response(head, exchange)
}

/// Forward the inbound body in read order, then close it with `request-end`.
async fn pump_request_body(conn: TunnelConnection, request_id: String, body: Body) {
    let mut frames = body.into_data_stream();
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(chunk) if chunk.is_empty() => continue,
            Ok(chunk) => {
                let msg = Message::RequestData {
                    request_id: request_id.clone(),
                    chunk,
                };
                if conn.send(&msg).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "inbound request body failed");
                break;
            }
        }
    }
    let _ = conn.send(&Message::RequestEnd { request_id }).await;
}

fn build_response(head: ResponseHead, exchange: Exchange) -> Result<Response> {
    let status = StatusCode::from_u16(head.code)
        .map_err(|_| WsMinerError::Upstream(format!("invalid status code {}", head.code)))?;

    // Headers come from a probe, not from the streamed response: the body is
    // re-framed here, so its length is not trusted.
    let mut headers = head.headers;
    headers.strip_hop_by_hop();
    headers.remove("content-length");

    let mut response = Response::new(Body::from_stream(exchange.into_body_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = headers.to_http();
    Ok(response)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn error_response(e: &WsMinerError) -> Response {
    let status = match e.code() {
        ErrorCode::UnknownConnection => StatusCode::NOT_FOUND,
        ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!(error = %e, status = status.as_u16(), "exchange failed");
    (status, status.canonical_reason().unwrap_or_default()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(uri: &str) -> Option<TunnelTarget> {
        TunnelTarget::parse(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn strips_connection_prefix() {
        let t = target("/abc123/hello/world").unwrap();
        assert_eq!(t.connection_id, "abc123");
        assert_eq!(t.upstream_path, "/hello/world");
    }

    #[test]
    fn keeps_query_string() {
        let t = target("/abc123/search?q=rust&page=2").unwrap();
        assert_eq!(t.upstream_path, "/search?q=rust&page=2");
    }

    #[test]
    fn bare_connection_maps_to_upstream_root() {
        assert_eq!(target("/abc123").unwrap().upstream_path, "/");
        assert_eq!(target("/abc123/").unwrap().upstream_path, "/");
        assert_eq!(target("/abc123?x=1").unwrap().upstream_path, "/?x=1");
    }

    #[test]
    fn root_has_no_target() {
        assert!(target("/").is_none());
    }
}
