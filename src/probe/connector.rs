use crate::error::Result;
use crate::model::{ProbeConfig, TlsVersion};
use openssl::ssl::{Ssl, SslConnector, SslMethod, SslVerifyMode, SslVersion};

/// Offered when a legacy version is pinned without a suite restriction.
const LEGACY_CIPHER_LIST: &str = "ALL:@SECLEVEL=0";

fn ssl_version(version: TlsVersion) -> SslVersion {
    match version {
        TlsVersion::Tls10 => SslVersion::TLS1,
        TlsVersion::Tls11 => SslVersion::TLS1_1,
        TlsVersion::Tls12 => SslVersion::TLS1_2,
        TlsVersion::Tls13 => SslVersion::TLS1_3,
    }
}

/// Builds the OpenSSL session for one probe: pinned versions, the optional
/// single-suite restriction, SNI, and no certificate or hostname checks.
pub(super) fn session_for(cfg: &ProbeConfig) -> Result<Ssl> {
    let mut builder = SslConnector::builder(SslMethod::tls_client())?;
    // We only care whether the peer negotiates, never whether it is trusted.
    builder.set_verify(SslVerifyMode::NONE);
    builder.set_min_proto_version(cfg.min_version.map(ssl_version))?;
    builder.set_max_proto_version(cfg.max_version.map(ssl_version))?;

    let legacy = cfg.min_version.is_some_and(TlsVersion::is_legacy);
    match cfg.cipher {
        Some(candidate) => builder.set_cipher_list(&cipher_list(candidate.openssl))?,
        None if legacy => builder.set_cipher_list(LEGACY_CIPHER_LIST)?,
        None => {}
    }

    let mut connect = builder.build().configure()?;
    connect.set_verify_hostname(false);
    let ssl = connect.into_ssl(cfg.target.server_name())?;
    Ok(ssl)
}

/// Restricts the offer to exactly one suite. The security level is dropped so
/// OpenSSL 3 still offers CBC-SHA1 suites on TLS 1.0 and 1.1.
fn cipher_list(openssl_name: &str) -> String {
    format!("{openssl_name}:@SECLEVEL=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CipherCandidate, Target};

    static CANDIDATE: CipherCandidate = CipherCandidate {
        iana: "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        openssl: "ECDHE-RSA-AES128-GCM-SHA256",
    };

    fn target() -> Target {
        Target::new("localhost", "443").unwrap()
    }

    #[test]
    fn single_suite_restriction_lowers_security_level() {
        assert_eq!(
            cipher_list("ECDHE-RSA-AES128-SHA"),
            "ECDHE-RSA-AES128-SHA:@SECLEVEL=0"
        );
    }

    #[test]
    fn builds_pinned_session_with_restriction() {
        let cfg = ProbeConfig::pinned(&target(), TlsVersion::Tls12, None).with_cipher(&CANDIDATE);
        assert!(session_for(&cfg).is_ok());
    }

    #[test]
    fn builds_unpinned_session() {
        let cfg = ProbeConfig::unpinned(&target(), None);
        assert!(session_for(&cfg).is_ok());
    }

    #[test]
    fn rejects_unknown_cipher_spelling() {
        static BOGUS: CipherCandidate = CipherCandidate {
            iana: "TLS_BOGUS",
            openssl: "NOT-A-REAL-CIPHER",
        };
        let cfg = ProbeConfig::pinned(&target(), TlsVersion::Tls12, None).with_cipher(&BOGUS);
        assert!(session_for(&cfg).is_err());
    }
}
