//! Request forwarding to a local upstream.
//!
//! Method, headers and body are passed through; `Host` is rewritten to the
//! target by the client and hop-by-hop headers are dropped. Response bodies
//! are streamed back as they arrive, which keeps SSE working. Requests asking
//! for a connection upgrade keep their upgrade headers and, on `101`, the two
//! upgraded connections are spliced together.
//!
//! Nothing is retried. Upstream failures become a bare `502 Bad Gateway`.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use thiserror::Error;

use crate::proxy::ProxyState;

/// Hop-by-hop headers, never forwarded in either direction (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
];

#[derive(Error, Debug)]
enum ForwardError {
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to build response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Fallback handler: resolve the route and forward, or 404.
pub async fn forward(State(state): State<ProxyState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let Some(resolved) = state.routes.resolve(&path, req.uri().query()) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    let url = resolved.url();
    tracing::debug!(method = %req.method(), path = %path, upstream = %url, "forwarding request");

    match forward_to(&state.client, req, &url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(upstream = %url, error = %e, "proxy error");
            (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
        }
    }
}

async fn forward_to(
    client: &reqwest::Client,
    mut req: Request,
    url: &str,
) -> Result<Response, ForwardError> {
    let upgrade = is_upgrade_request(req.headers());
    let on_upgrade = if upgrade {
        req.extensions_mut().remove::<OnUpgrade>()
    } else {
        None
    };

    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await?;

    let upstream = client
        .request(parts.method, url)
        .headers(request_headers(&parts.headers, upgrade))
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    let switching = status == StatusCode::SWITCHING_PROTOCOLS;
    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        *headers = response_headers(upstream.headers(), switching);
    }

    if switching {
        match on_upgrade {
            Some(on_upgrade) => {
                tokio::spawn(tunnel(on_upgrade, upstream, url.to_string()));
            }
            None => tracing::warn!(
                upstream = %url,
                "upstream switched protocols without a client upgrade"
            ),
        }
        return Ok(builder.body(Body::empty())?);
    }

    Ok(builder.body(Body::from_stream(upstream.bytes_stream()))?)
}

/// Splice the client's upgraded connection to the upstream's.
async fn tunnel(on_upgrade: OnUpgrade, upstream: reqwest::Response, url: String) {
    let mut upstream_io = match upstream.upgrade().await {
        Ok(io) => io,
        Err(e) => {
            tracing::warn!(upstream = %url, error = %e, "upstream upgrade failed");
            return;
        }
    };
    let mut client_io = match on_upgrade.await {
        Ok(upgraded) => TokioIo::new(upgraded),
        Err(e) => {
            tracing::warn!(upstream = %url, error = %e, "client upgrade failed");
            return;
        }
    };

    match tokio::io::copy_bidirectional(&mut client_io, &mut upstream_io).await {
        Ok((sent, received)) => {
            tracing::debug!(upstream = %url, sent, received, "upgraded connection closed");
        }
        Err(e) => {
            tracing::debug!(upstream = %url, error = %e, "upgraded connection ended with error");
        }
    }
}

/// True when the request asks for a protocol upgrade.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(header::UPGRADE)
        && headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Headers to send upstream. `Host` is left for the client to set from the
/// target URL and `Content-Length` is recomputed from the buffered body.
pub fn request_headers(src: &HeaderMap, upgrade: bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(src.len());
    for (name, value) in src {
        if name == header::HOST || name == header::CONTENT_LENGTH {
            continue;
        }
        if !keep_header(name, upgrade) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Headers to return to the caller.
pub fn response_headers(src: &HeaderMap, upgrade: bool) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(src.len());
    for (name, value) in src {
        if keep_header(name, upgrade) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

fn keep_header(name: &HeaderName, upgrade: bool) -> bool {
    if upgrade && name == header::CONNECTION {
        return true;
    }
    if name == header::UPGRADE {
        return upgrade;
    }
    !HOP_BY_HOP.contains(&name.as_str())
}
