//! Onward: a single-destination HTTP forward proxy.
//!
//! Inbound requests are forwarded to one configured destination after a
//! small transformation pipeline: ordered regex path rewriting (first match
//! wins), header injection, and basic-auth credential injection. The
//! upstream leg can carry an extended trust store (extra CA certificate)
//! and a client identity loaded from a password-protected PKCS#12 archive
//! for mutual TLS.

pub mod config;
pub mod proxy;
