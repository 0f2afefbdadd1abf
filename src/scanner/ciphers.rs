use crate::error::{Result, ScanError};
use crate::model::{CipherCandidate, ProbeConfig, Target, TlsVersion};
use crate::probe::Prober;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const ECDHE_RSA_CBC: &[CipherCandidate] = &[
    CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        openssl: "ECDHE-RSA-AES128-SHA",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        openssl: "ECDHE-RSA-AES256-SHA",
    },
];

const TLS12_AEAD: &[CipherCandidate] = &[
    CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        openssl: "ECDHE-RSA-AES128-GCM-SHA256",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        openssl: "ECDHE-RSA-AES256-GCM-SHA384",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        openssl: "ECDHE-RSA-CHACHA20-POLY1305",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        openssl: "ECDHE-ECDSA-AES128-GCM-SHA256",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        openssl: "ECDHE-ECDSA-AES256-GCM-SHA384",
    },
    CipherCandidate {
        iana: "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
        openssl: "ECDHE-ECDSA-CHACHA20-POLY1305",
    },
];

/// Suites tried one by one for each version the client can still choose for.
/// TLS 1.3 has none: the server picks its suite.
pub fn candidates(version: TlsVersion) -> Option<&'static [CipherCandidate]> {
    match version {
        TlsVersion::Tls10 | TlsVersion::Tls11 => Some(ECDHE_RSA_CBC),
        TlsVersion::Tls12 => Some(TLS12_AEAD),
        TlsVersion::Tls13 => None,
    }
}

/// Lists the suites `version` accepts, in candidate order.
///
/// Callers only ask about versions the sweep already found, so an empty
/// result contradicts the sweep and is reported as an error.
pub(crate) async fn enumerate<P: Prober + ?Sized>(
    prober: &P,
    target: &Target,
    version: TlsVersion,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    if version == TlsVersion::Tls13 {
        return negotiated_tls13(prober, target, timeout, cancel).await;
    }

    let suites = candidates(version).ok_or_else(|| {
        ScanError::Configuration(format!("no cipher suites configured for {version}"))
    })?;

    let mut supported = Vec::with_capacity(suites.len());
    for candidate in suites {
        let cfg = ProbeConfig::pinned(target, version, timeout).with_cipher(candidate);
        let accepted = prober.probe(&cfg, cancel).await.accepted()?.is_some();
        debug!(host = %target.host, %version, cipher = candidate.iana, accepted, "cipher probed");
        if accepted {
            supported.push(candidate.iana.to_string());
        }
    }

    if supported.is_empty() {
        return Err(ScanError::EnumerationInconsistency(version.to_string()));
    }

    Ok(supported)
}

async fn negotiated_tls13<P: Prober + ?Sized>(
    prober: &P,
    target: &Target,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<Vec<String>> {
    let cfg = ProbeConfig::pinned(target, TlsVersion::Tls13, timeout);
    let negotiated = prober
        .probe(&cfg, cancel)
        .await
        .accepted()?
        .ok_or_else(|| ScanError::ProtocolMismatch("TLS 1.3 not supported".into()))?;

    let cipher = negotiated.cipher.ok_or_else(|| {
        ScanError::ProtocolMismatch("unable to determine TLS 1.3 cipher suite".into())
    })?;
    Ok(vec![cipher])
}
