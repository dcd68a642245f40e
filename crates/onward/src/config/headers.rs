//! Outbound header construction.

use super::ConfigError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};

/// Header mutations applied to every forwarded request.
///
/// Static headers are appended to whatever the inbound request already
/// carries; multiple configured values for one name keep their declaration
/// order. The basic-auth credential replaces any inbound `Authorization`
/// header (a request with two credential headers is malformed HTTP).
pub struct HeaderPolicy {
    extra: Vec<(HeaderName, HeaderValue)>,
    authorization: Option<HeaderValue>,
}

impl std::fmt::Debug for HeaderPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderPolicy")
            .field("extra", &self.extra)
            .field("authorization", &self.authorization)
            .finish()
    }
}

impl HeaderPolicy {
    /// Parse the configured header pairs and precompute the basic-auth
    /// credential. Invalid names or values fail construction.
    pub fn build(
        headers: &[(String, String)],
        username: &str,
        password: &str,
    ) -> Result<Self, ConfigError> {
        let mut extra = Vec::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::HeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| ConfigError::HeaderValue(name.clone()))?;
            extra.push((header_name, header_value));
        }
        Ok(Self {
            extra,
            authorization: basic_auth(username, password)?,
        })
    }

    /// Apply the policy to an outbound header map.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.extra {
            headers.append(name.clone(), value.clone());
        }
        if let Some(credential) = &self.authorization {
            headers.insert(AUTHORIZATION, credential.clone());
        }
    }

    pub fn has_authorization(&self) -> bool {
        self.authorization.is_some()
    }
}

/// Encode the basic-auth credential.
///
/// Emitted whenever either side is configured; a missing counterpart is
/// encoded as the empty string rather than skipped.
fn basic_auth(username: &str, password: &str) -> Result<Option<HeaderValue>, ConfigError> {
    if username.is_empty() && password.is_empty() {
        return Ok(None);
    }
    let credential = STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {credential}"))
        .map_err(|_| ConfigError::HeaderValue(AUTHORIZATION.as_str().to_string()))?;
    value.set_sensitive(true);
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_static_headers_append_in_order() {
        let policy =
            HeaderPolicy::build(&pairs(&[("X-Trace", "a"), ("X-Trace", "b")]), "", "").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-trace", HeaderValue::from_static("original"));
        policy.apply(&mut headers);

        let values: Vec<_> = headers
            .get_all("x-trace")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["original", "a", "b"]);
    }

    #[test]
    fn test_basic_auth_encoding() {
        let policy = HeaderPolicy::build(&[], "user", "pass").unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);

        // base64("user:pass")
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_basic_auth_replaces_inbound_credential() {
        let policy = HeaderPolicy::build(&[], "user", "pass").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        policy.apply(&mut headers);

        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_basic_auth_with_empty_password() {
        let policy = HeaderPolicy::build(&[], "user", "").unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);

        // base64("user:")
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic dXNlcjo=");
    }

    #[test]
    fn test_basic_auth_with_empty_username() {
        let policy = HeaderPolicy::build(&[], "", "pass").unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);

        // base64(":pass")
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Basic OnBhc3M=");
    }

    #[test]
    fn test_no_auth_when_both_empty() {
        let policy = HeaderPolicy::build(&[], "", "").unwrap();
        assert!(!policy.has_authorization());

        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_credential_is_sensitive() {
        let policy = HeaderPolicy::build(&[], "user", "pass").unwrap();
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_invalid_header_name_fails() {
        let err = HeaderPolicy::build(&pairs(&[("bad name", "v")]), "", "").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderName(_)));
    }

    #[test]
    fn test_invalid_header_value_fails() {
        let err = HeaderPolicy::build(&pairs(&[("X-Bad", "line\nbreak")]), "", "").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderValue(_)));
    }
}
