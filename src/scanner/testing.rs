//! A scripted prober so scan logic can be exercised without sockets.

use crate::error::ScanError;
use crate::model::{ProbeConfig, TlsVersion};
use crate::probe::{HandshakeOutcome, Negotiated, Prober};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct ScriptedProber {
    accepted: HashMap<TlsVersion, Vec<&'static str>>,
    fail_on: Option<TlsVersion>,
    withhold_cipher: bool,
    calls: Mutex<Vec<(TlsVersion, Option<&'static str>)>>,
}

impl ScriptedProber {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Accept `version`, and with a suite restriction only the listed suites.
    pub(crate) fn accept(mut self, version: TlsVersion, suites: &[&'static str]) -> Self {
        self.accepted.insert(version, suites.to_vec());
        self
    }

    /// Any probe pinned to `version` fails as if the dial was refused.
    pub(crate) fn fail_on(mut self, version: TlsVersion) -> Self {
        self.fail_on = Some(version);
        self
    }

    /// Successful handshakes report no negotiated suite.
    pub(crate) fn without_cipher(mut self) -> Self {
        self.withhold_cipher = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<(TlsVersion, Option<&'static str>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, cfg: &ProbeConfig, cancel: &CancellationToken) -> HandshakeOutcome {
        if cancel.is_cancelled() {
            return HandshakeOutcome::HardFailure(ScanError::Cancelled);
        }

        let version = cfg.max_version.expect("scripted probes are always pinned");
        let offered = cfg.cipher.map(|c| c.iana);
        self.calls.lock().unwrap().push((version, offered));

        if self.fail_on == Some(version) {
            return HandshakeOutcome::HardFailure(ScanError::Network {
                address: cfg.target.address(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }

        let Some(suites) = self.accepted.get(&version) else {
            return HandshakeOutcome::SoftFailure("protocol version".into());
        };

        let fallback = match version {
            TlsVersion::Tls13 => "TLS_AES_128_GCM_SHA256",
            _ => "TLS_RSA_WITH_AES_128_CBC_SHA",
        };
        let cipher = match offered {
            Some(name) if suites.contains(&name) => name,
            Some(_) => return HandshakeOutcome::SoftFailure("handshake failure".into()),
            None => suites.first().copied().unwrap_or(fallback),
        };

        HandshakeOutcome::Success(Negotiated {
            version: Some(version),
            protocol: version.name().to_string(),
            cipher: (!self.withhold_cipher).then(|| cipher.to_string()),
            inspected: (),
        })
    }
}
