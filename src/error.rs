//! Error types for TLS scanning.

use std::time::Duration;
use thiserror::Error;

/// Everything that can stop a probe, a sweep or a fetch.
///
/// Only `ProtocolMismatch` describes a remote that answered and said no; it is
/// folded into result tables by the sweep and the enumerator and only surfaces
/// when a caller needs a handshake to succeed. Every other variant is fatal for
/// the operation in progress.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("dial {address}: {source}")]
    Network {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {address} timed out after {timeout:?}")]
    HandshakeTimeout { address: String, timeout: Duration },

    #[error("scan cancelled")]
    Cancelled,

    #[error("{0}")]
    ProtocolMismatch(String),

    #[error("no cipher suites detected for {0}")]
    EnumerationInconsistency(String),

    #[error("unreadable certificate {field}: {source}")]
    Certificate {
        field: &'static str,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] openssl::error::ErrorStack),
}

pub type Result<T> = std::result::Result<T, ScanError>;
