//! The per-request forwarding handler.
//!
//! Owns everything derived from the configuration: the parsed destination,
//! compiled rewrite rules, the header policy, and the shared upstream
//! client carrying the loaded TLS material. Built once at startup and
//! shared read-only across all connections.

use super::client::{create_http_client, HttpClient};
use super::forwarding::forward_request;
use crate::config::{
    ConfigError, Destination, HeaderPolicy, Parameters, RewriteSet, TlsMaterial,
};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use std::convert::Infallible;
use tracing::debug;

pub struct ForwardHandler {
    destination: Destination,
    rewrites: RewriteSet,
    headers: HeaderPolicy,
    client: HttpClient,
}

impl std::fmt::Debug for ForwardHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardHandler")
            .field("destination", &self.destination)
            .field("rewrites", &self.rewrites)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ForwardHandler {
    /// Compile the raw parameters into a ready-to-serve handler.
    ///
    /// Every failure here is a `ConfigError`; a handler is never returned
    /// half-initialized, and nothing in this struct can fail per-request.
    pub fn new(destination: &str, params: &Parameters) -> Result<Self, ConfigError> {
        let destination = Destination::parse(destination)?;
        let rewrites = RewriteSet::compile(&params.rewrite_paths)?;
        let headers = HeaderPolicy::build(&params.headers, &params.username, &params.password)?;
        let tls = TlsMaterial::load(
            params.ca_cert_path.as_deref(),
            params.pkcs12_path.as_deref(),
            &params.pkcs12_password,
        )?;
        let client = create_http_client(&tls);

        Ok(Self {
            destination,
            rewrites,
            headers,
            client,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn rewrite_rule_count(&self) -> usize {
        self.rewrites.len()
    }

    /// Handle one inbound request.
    pub async fn handle(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
        debug!("Received request: {} {}", req.method(), req.uri());
        Ok(forward_request(
            &self.client,
            &self.destination,
            &self.rewrites,
            &self.headers,
            req,
        )
        .await)
    }
}
