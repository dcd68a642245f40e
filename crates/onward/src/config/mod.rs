//! Configuration types for the forward proxy.

mod destination;
mod headers;
mod rewrite;
mod tls;

pub use destination::Destination;
pub use headers::HeaderPolicy;
pub use rewrite::{PathRewriter, RegexRewriter, RewriteSet};
pub use tls::TlsMaterial;

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning raw parameters into a running proxy.
///
/// Every variant is fatal at startup; none of them can occur per-request.
/// The proxy never starts serving with a partially loaded configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid rewrite rule '{0}': expected '<pattern>:<replacement>'")]
    MalformedRewriteRule(String),

    #[error("failed to compile rewrite pattern '{pattern}': {source}")]
    RewritePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid header '{0}': expected '<name>:<value>'")]
    MalformedHeader(String),

    #[error("invalid header name '{0}'")]
    HeaderName(String),

    #[error("invalid value for header '{0}'")]
    HeaderValue(String),

    #[error("invalid destination URL '{url}': {reason}")]
    Destination { url: String, reason: String },

    #[error("failed to read CA certificate '{path}': {source}")]
    CaCertRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CA certificate '{path}': {reason}")]
    CaCertParse { path: PathBuf, reason: String },

    #[error("failed to read PKCS#12 archive '{path}': {source}")]
    Pkcs12Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode PKCS#12 archive '{path}': {reason}")]
    Pkcs12Decode { path: PathBuf, reason: String },

    #[error("PKCS#12 archive '{path}' holds {count} private key entries, expected exactly one")]
    Pkcs12KeyCount { path: PathBuf, count: usize },

    #[error("failed to build TLS client configuration: {0}")]
    Tls(#[from] rustls::Error),
}

/// Raw construction parameters, as supplied by the CLI.
///
/// Plain data; compiled into a `ForwardHandler` once at startup. Rewrite
/// rules and headers are ordered sequences, and their declaration order is
/// significant.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    /// Ordered `(pattern, replacement)` path rewrite rules. First match wins.
    pub rewrite_paths: Vec<(String, String)>,
    /// Ordered `(name, value)` headers added to every forwarded request.
    pub headers: Vec<(String, String)>,
    /// Username for basic authentication against the destination.
    pub username: String,
    /// Password for basic authentication against the destination.
    pub password: String,
    /// Path of an additional CA certificate PEM trusted for the destination.
    pub ca_cert_path: Option<PathBuf>,
    /// Path of a PKCS#12 archive holding the client certificate and key.
    pub pkcs12_path: Option<PathBuf>,
    /// Password for the PKCS#12 archive.
    pub pkcs12_password: String,
}

impl Parameters {
    /// Parse a `<pattern>:<replacement>` rewrite argument.
    pub fn parse_rewrite(arg: &str) -> Result<(String, String), ConfigError> {
        match arg.split_once(':') {
            Some((pattern, replacement)) if !pattern.is_empty() => {
                Ok((pattern.to_string(), replacement.to_string()))
            }
            _ => Err(ConfigError::MalformedRewriteRule(arg.to_string())),
        }
    }

    /// Parse a `<name>:<value>` header argument. The value may itself
    /// contain ':' (e.g. `Host:https://example.com`).
    pub fn parse_header(arg: &str) -> Result<(String, String), ConfigError> {
        match arg.split_once(':') {
            Some((name, value)) if !name.is_empty() => {
                Ok((name.to_string(), value.trim_start().to_string()))
            }
            _ => Err(ConfigError::MalformedHeader(arg.to_string())),
        }
    }
}
