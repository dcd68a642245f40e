//! Upstream HTTP client construction.

use crate::config::TlsMaterial;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Type alias for the shared upstream client.
pub type HttpClient =
    Client<hyper_rustls::HttpsConnector<HttpConnector>, BoxBody<Bytes, hyper::Error>>;

/// Create the shared upstream client, parameterized by the loaded TLS
/// material.
///
/// The connector speaks both plain HTTP and HTTPS; encrypted destinations
/// use the trust store and client identity carried by `tls`, plain
/// destinations bypass TLS entirely. Pool behavior is the transport default.
pub fn create_http_client(tls: &TlsMaterial) -> HttpClient {
    let mut http_connector = HttpConnector::new();
    http_connector.enforce_http(false);

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls.client_config().clone())
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Client::builder(TokioExecutor::new()).build(https_connector)
}
