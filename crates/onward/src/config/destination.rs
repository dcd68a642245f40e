//! Destination base URL parsing and per-request URI construction.

use super::ConfigError;
use hyper::http::uri::{Authority, Scheme};
use hyper::Uri;
use std::fmt;

/// The parsed base URL every inbound request is forwarded toward.
///
/// Holds the scheme, the authority, and an optional fixed path prefix taken
/// from the destination URL. Set once at construction, never mutated.
#[derive(Debug, Clone)]
pub struct Destination {
    scheme: Scheme,
    authority: Authority,
    /// Fixed path prefix, without a trailing slash. Empty for a bare host.
    prefix: String,
}

impl Destination {
    /// Parse and validate an absolute destination URL.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let uri: Uri = raw.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            ConfigError::Destination {
                url: raw.to_string(),
                reason: e.to_string(),
            }
        })?;

        let scheme = match uri.scheme() {
            Some(s) if *s == Scheme::HTTP || *s == Scheme::HTTPS => s.clone(),
            Some(other) => {
                return Err(ConfigError::Destination {
                    url: raw.to_string(),
                    reason: format!("unsupported scheme '{other}'"),
                })
            }
            None => {
                return Err(ConfigError::Destination {
                    url: raw.to_string(),
                    reason: "missing scheme".to_string(),
                })
            }
        };
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| ConfigError::Destination {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            })?;
        let prefix = uri.path().trim_end_matches('/').to_string();

        Ok(Self {
            scheme,
            authority,
            prefix,
        })
    }

    pub fn is_https(&self) -> bool {
        self.scheme == Scheme::HTTPS
    }

    /// Build the effective upstream URI: destination base + rewritten path +
    /// the original query string unchanged.
    pub fn uri_for(&self, path: &str, query: Option<&str>) -> Result<Uri, hyper::http::Error> {
        let path_and_query = match query {
            Some(q) => format!("{}{}?{}", self.prefix, path, q),
            None => format!("{}{}", self.prefix, path),
        };
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.prefix)
    }
}
