//! Upstream TLS trust and identity material.
//!
//! Builds the rustls client configuration used for the upstream leg: the
//! webpki root set, optionally extended with an extra CA certificate, and
//! optionally a client identity decoded from a password-protected PKCS#12
//! archive for mutual TLS.

use super::ConfigError;
use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::path::Path;
use std::sync::Arc;

/// Immutable TLS client material, built once at handler construction and
/// shared across all outbound connections. Never reloaded at runtime.
#[derive(Clone)]
pub struct TlsMaterial {
    client_config: ClientConfig,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial").finish_non_exhaustive()
    }
}

impl TlsMaterial {
    /// Load trust and identity material from the configured paths.
    ///
    /// All file access and archive decryption happens here; the result
    /// holds only the derived in-memory configuration. Any unreadable or
    /// malformed input fails construction.
    pub fn load(
        ca_cert_path: Option<&Path>,
        pkcs12_path: Option<&Path>,
        pkcs12_password: &str,
    ) -> Result<Self, ConfigError> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        if let Some(path) = ca_cert_path {
            for cert in load_ca_certs(path)? {
                roots.add(cert).map_err(|e| ConfigError::CaCertParse {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            }
        }

        // Pin the crypto provider; the process-default lookup is ambiguous
        // when a dependency enables a second provider.
        let builder = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots);
        let client_config = match pkcs12_path {
            Some(path) => {
                let (chain, key) = load_identity(path, pkcs12_password)?;
                builder.with_client_auth_cert(chain, key)?
            }
            None => builder.with_no_client_auth(),
        };

        Ok(Self { client_config })
    }

    /// The rustls client configuration backing the upstream connector.
    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }
}

/// Parse every PEM certificate in the file. An unreadable file, a parse
/// failure, or a file with no certificates is a configuration error.
fn load_ca_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
    let data = std::fs::read(path).map_err(|source| ConfigError::CaCertRead {
        path: path.to_path_buf(),
        source,
    })?;

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut data.as_slice())
        .collect::<Result<_, _>>()
        .map_err(|e| ConfigError::CaCertParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if certs.is_empty() {
        return Err(ConfigError::CaCertParse {
            path: path.to_path_buf(),
            reason: "no certificates found".to_string(),
        });
    }
    Ok(certs)
}

/// Decrypt the PKCS#12 archive and extract its certificate chain and
/// private key. The archive must hold exactly one private key entry.
fn load_identity(
    path: &Path,
    password: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ConfigError> {
    let data = std::fs::read(path).map_err(|source| ConfigError::Pkcs12Read {
        path: path.to_path_buf(),
        source,
    })?;

    let keystore =
        KeyStore::from_pkcs12(&data, password).map_err(|e| ConfigError::Pkcs12Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut key_chains = Vec::new();
    for (_alias, entry) in keystore.entries() {
        if let KeyStoreEntry::PrivateKeyChain(chain) = entry {
            key_chains.push(chain);
        }
    }
    if key_chains.len() != 1 {
        return Err(ConfigError::Pkcs12KeyCount {
            path: path.to_path_buf(),
            count: key_chains.len(),
        });
    }

    let identity = &key_chains[0];
    let chain: Vec<CertificateDer<'static>> = identity
        .chain()
        .iter()
        .map(|cert| CertificateDer::from(cert.as_der().to_vec()))
        .collect();
    let key = PrivateKeyDer::try_from(identity.key().to_vec()).map_err(|e| {
        ConfigError::Pkcs12Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    Ok((chain, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn test_defaults_without_any_material() {
        let material = TlsMaterial::load(None, None, "").unwrap();
        assert!(!material.client_config().client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_loads_extra_ca() {
        let material = TlsMaterial::load(Some(&fixture("ca.pem")), None, "");
        assert!(material.is_ok());
    }

    #[test]
    fn test_reloading_same_ca_is_equivalent() {
        let first = TlsMaterial::load(Some(&fixture("ca.pem")), None, "").unwrap();
        let second = TlsMaterial::load(Some(&fixture("ca.pem")), None, "").unwrap();
        assert_eq!(
            first.client_config().client_auth_cert_resolver.has_certs(),
            second.client_config().client_auth_cert_resolver.has_certs()
        );
    }

    #[test]
    fn test_missing_ca_file_fails() {
        let err = TlsMaterial::load(Some(Path::new("/nonexistent/ca.pem")), None, "").unwrap_err();
        assert!(matches!(err, ConfigError::CaCertRead { .. }));
    }

    #[test]
    fn test_malformed_ca_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not a certificate").unwrap();

        let err = TlsMaterial::load(Some(file.path()), None, "").unwrap_err();
        match err {
            ConfigError::CaCertParse { reason, .. } => {
                assert!(reason.contains("no certificates found"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_pkcs12_with_correct_password() {
        let material = TlsMaterial::load(None, Some(&fixture("client.p12")), "secret").unwrap();
        assert!(material.client_config().client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn test_pkcs12_with_wrong_password_fails() {
        let err =
            TlsMaterial::load(None, Some(&fixture("client.p12")), "wrong-password").unwrap_err();
        assert!(matches!(err, ConfigError::Pkcs12Decode { .. }));
    }

    #[test]
    fn test_malformed_pkcs12_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"garbage, not an archive").unwrap();

        let err = TlsMaterial::load(None, Some(file.path()), "secret").unwrap_err();
        assert!(matches!(err, ConfigError::Pkcs12Decode { .. }));
    }

    #[test]
    fn test_missing_pkcs12_file_fails() {
        let err =
            TlsMaterial::load(None, Some(Path::new("/nonexistent/id.p12")), "secret").unwrap_err();
        assert!(matches!(err, ConfigError::Pkcs12Read { .. }));
    }
}
