//! Request forwarding to the destination.
//!
//! Builds the upstream request (rewritten path, filtered and merged
//! headers) and relays the upstream response verbatim, streaming both
//! bodies.

use super::client::HttpClient;
use crate::config::{Destination, HeaderPolicy, RewriteSet};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderMap, CONNECTION, HOST};
use hyper::{Request, Response};
use std::convert::Infallible;
use tracing::{debug, error};

/// Hop-by-hop headers never forwarded verbatim (RFC 9110 section 7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Helper to create a gateway error response.
pub fn error_response(status: u16, message: &str) -> Response<BoxBody<Bytes, hyper::Error>> {
    let body = format!(r#"{{"error": "{message}"}}"#);
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(BoxBody::new(
            Full::new(Bytes::from(body)).map_err(|never: Infallible| match never {}),
        ))
        .unwrap()
}

/// Copy inbound headers minus hop-by-hop headers, `Host`, and any header
/// the inbound `Connection` header names.
fn filter_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut connection_named: Vec<String> = Vec::new();
    for value in inbound.get_all(CONNECTION) {
        if let Ok(tokens) = value.to_str() {
            connection_named.extend(tokens.split(',').map(|t| t.trim().to_ascii_lowercase()));
        }
    }

    let mut filtered = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        // HeaderName::as_str is always lowercase
        let lowered = name.as_str();
        if name == &HOST
            || HOP_BY_HOP.contains(&lowered)
            || connection_named.iter().any(|named| named == lowered)
        {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Forward one inbound request to the destination with a streaming body and
/// relay the streamed response.
///
/// Upstream transport failures produce a single 502 to the caller and are
/// never retried; upstream non-2xx statuses are relayed verbatim.
pub async fn forward_request(
    client: &HttpClient,
    destination: &Destination,
    rewrites: &RewriteSet,
    headers: &HeaderPolicy,
    req: Request<Incoming>,
) -> Response<BoxBody<Bytes, hyper::Error>> {
    let (parts, body) = req.into_parts();

    let path = match rewrites.rewrite(parts.uri.path()) {
        Some(rewritten) => {
            debug!("Rewrote path {} -> {}", parts.uri.path(), rewritten);
            rewritten
        }
        None => parts.uri.path().to_string(),
    };

    let uri = match destination.uri_for(&path, parts.uri.query()) {
        Ok(uri) => uri,
        Err(e) => {
            error!("Failed to build upstream URI for path '{}': {}", path, e);
            return error_response(502, "Bad Gateway");
        }
    };

    debug!("Forwarding to: {}", uri);

    let mut outbound = filter_headers(&parts.headers);
    headers.apply(&mut outbound);

    let mut upstream_req = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(BoxBody::new(body))
        .unwrap();
    *upstream_req.headers_mut() = outbound;

    match client.request(upstream_req).await {
        Ok(upstream_response) => {
            let (parts, body) = upstream_response.into_parts();
            Response::from_parts(parts, BoxBody::new(body))
        }
        Err(e) => {
            error!("Failed to forward request to upstream: {}", e);
            error_response(502, "Bad Gateway")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_error_response_basic() {
        let response = error_response(502, "Bad Gateway");
        assert_eq!(response.status(), 502);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_filter_strips_hop_by_hop() {
        let mut inbound = HeaderMap::new();
        inbound.insert("connection", HeaderValue::from_static("keep-alive"));
        inbound.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        inbound.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        inbound.insert("x-custom", HeaderValue::from_static("kept"));

        let filtered = filter_headers(&inbound);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("x-custom").unwrap(), "kept");
    }

    #[test]
    fn test_filter_strips_connection_named_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert("connection", HeaderValue::from_static("X-Per-Hop, close"));
        inbound.insert("x-per-hop", HeaderValue::from_static("gone"));
        inbound.insert("x-end-to-end", HeaderValue::from_static("kept"));

        let filtered = filter_headers(&inbound);
        assert!(filtered.get("x-per-hop").is_none());
        assert_eq!(filtered.get("x-end-to-end").unwrap(), "kept");
    }

    #[test]
    fn test_filter_strips_host() {
        let mut inbound = HeaderMap::new();
        inbound.insert("host", HeaderValue::from_static("proxy.local:8080"));
        inbound.insert("accept", HeaderValue::from_static("*/*"));

        let filtered = filter_headers(&inbound);
        assert!(filtered.get("host").is_none());
        assert_eq!(filtered.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn test_filter_keeps_repeated_values() {
        let mut inbound = HeaderMap::new();
        inbound.append("x-trace", HeaderValue::from_static("a"));
        inbound.append("x-trace", HeaderValue::from_static("b"));

        let filtered = filter_headers(&inbound);
        let values: Vec<_> = filtered
            .get_all("x-trace")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["a", "b"]);
    }
}
