//! One TCP connect plus one TLS handshake, classified three ways.

mod connector;

use crate::error::ScanError;
use crate::model::{ProbeConfig, TlsVersion};
use async_trait::async_trait;
use openssl::ssl::SslRef;
use std::future::Future;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What a single handshake attempt tells us.
#[derive(Debug)]
pub enum HandshakeOutcome<T = ()> {
    /// The remote negotiated; the connection is already closed.
    Success(Negotiated<T>),
    /// The remote refused what we offered. Absence of support, not an error.
    SoftFailure(String),
    /// Nothing can be concluded; the containing operation must stop.
    HardFailure(ScanError),
}

impl<T> HandshakeOutcome<T> {
    /// `Ok(Some)` on success, `Ok(None)` on rejection, `Err` on hard failure.
    pub fn accepted(self) -> Result<Option<Negotiated<T>>, ScanError> {
        match self {
            HandshakeOutcome::Success(negotiated) => Ok(Some(negotiated)),
            HandshakeOutcome::SoftFailure(_) => Ok(None),
            HandshakeOutcome::HardFailure(err) => Err(err),
        }
    }

    /// Like [`accepted`](Self::accepted) but a rejection is an error too.
    pub fn required(self) -> Result<Negotiated<T>, ScanError> {
        match self {
            HandshakeOutcome::Success(negotiated) => Ok(negotiated),
            HandshakeOutcome::SoftFailure(reason) => Err(ScanError::ProtocolMismatch(reason)),
            HandshakeOutcome::HardFailure(err) => Err(err),
        }
    }
}

/// Session parameters read from the live connection before it was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated<T = ()> {
    pub version: Option<TlsVersion>,
    /// Human name of the negotiated protocol, including unknown ones.
    pub protocol: String,
    /// IANA name when OpenSSL knows it, OpenSSL's own name otherwise.
    pub cipher: Option<String>,
    pub inspected: T,
}

/// The seam between the scan logic and the network.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, cfg: &ProbeConfig, cancel: &CancellationToken) -> HandshakeOutcome;
}

/// Real handshakes through OpenSSL.
#[derive(Clone, Debug, Default)]
pub struct OpensslProber;

#[async_trait]
impl Prober for OpensslProber {
    async fn probe(&self, cfg: &ProbeConfig, cancel: &CancellationToken) -> HandshakeOutcome {
        handshake(cfg, cancel, |_| ()).await
    }
}

enum Bounded<T> {
    Completed(T),
    Elapsed,
    Cancelled,
}

/// Runs `fut` until it finishes, the deadline passes, or `cancel` fires.
async fn bounded<F: Future>(
    deadline: Option<Instant>,
    cancel: &CancellationToken,
    fut: F,
) -> Bounded<F::Output> {
    let timer = async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Bounded::Cancelled,
        out = fut => Bounded::Completed(out),
        _ = timer => Bounded::Elapsed,
    }
}

/// Performs one handshake under `cfg` and lets `inspect` look at the live
/// session before the connection is closed.
///
/// A single deadline covers both the dial and the handshake. The TCP stream
/// is owned by this call and dropped on every path, so nothing outlives it.
pub async fn handshake<T, F>(
    cfg: &ProbeConfig,
    cancel: &CancellationToken,
    inspect: F,
) -> HandshakeOutcome<T>
where
    F: FnOnce(&SslRef) -> T,
{
    if cancel.is_cancelled() {
        return HandshakeOutcome::HardFailure(ScanError::Cancelled);
    }

    let address = cfg.target.address();
    let timeout = cfg.effective_timeout();
    let deadline = timeout.map(|t| Instant::now() + t);

    let ssl = match connector::session_for(cfg) {
        Ok(ssl) => ssl,
        Err(err) => return HandshakeOutcome::HardFailure(err),
    };

    let stream = match bounded(deadline, cancel, TcpStream::connect(address.as_str())).await {
        Bounded::Completed(Ok(stream)) => stream,
        Bounded::Completed(Err(source)) => {
            return HandshakeOutcome::HardFailure(ScanError::Network { address, source });
        }
        Bounded::Elapsed => {
            let source = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out");
            return HandshakeOutcome::HardFailure(ScanError::Network { address, source });
        }
        Bounded::Cancelled => return HandshakeOutcome::HardFailure(ScanError::Cancelled),
    };

    let mut tls = match SslStream::new(ssl, stream) {
        Ok(tls) => tls,
        Err(err) => return HandshakeOutcome::HardFailure(err.into()),
    };

    match bounded(deadline, cancel, Pin::new(&mut tls).connect()).await {
        Bounded::Completed(Ok(())) => {}
        Bounded::Completed(Err(err)) => {
            debug!(%address, error = %err, "handshake rejected");
            return HandshakeOutcome::SoftFailure(err.to_string());
        }
        Bounded::Elapsed => {
            return HandshakeOutcome::HardFailure(ScanError::HandshakeTimeout {
                address,
                timeout: timeout.unwrap_or_default(),
            });
        }
        Bounded::Cancelled => return HandshakeOutcome::HardFailure(ScanError::Cancelled),
    }

    let (version, protocol, cipher, inspected) = {
        let session = tls.ssl();
        let version = TlsVersion::from_openssl(session.version_str());
        let protocol = version
            .map(|v| v.name().to_string())
            .unwrap_or_else(|| format!("Unknown ({})", session.version_str()));
        let cipher = session
            .current_cipher()
            .map(|c| c.standard_name().unwrap_or(c.name()).to_string());
        (version, protocol, cipher, inspect(session))
    };

    // close_notify is a courtesy; the drop below closes the socket regardless.
    let _ = bounded(deadline, cancel, tls.shutdown()).await;
    drop(tls);

    debug!(%address, %protocol, cipher = cipher.as_deref().unwrap_or(""), "handshake accepted");
    HandshakeOutcome::Success(Negotiated {
        version,
        protocol,
        cipher,
        inspected,
    })
}
