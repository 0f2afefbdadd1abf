//! Single-connection certificate retrieval.

use crate::error::{Result, ScanError};
use crate::model::{Certificate, CertificateChain, DistinguishedName, ProbeConfig, Target};
use crate::probe::handshake;
use crate::util::{asn1_to_utc, serial_hex};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use openssl::asn1::Asn1TimeRef;
use openssl::nid::Nid;
use openssl::pkey::Id;
use openssl::ssl::SslRef;
use openssl::x509::{X509NameRef, X509Ref};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Certificates inside this window before expiry are flagged in the logs.
const EXPIRY_WARNING_DAYS: i64 = 30;

/// Fetches the peer chain over one connection with default negotiation.
pub struct CertificateInspector {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CertificateInspector {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, host: &str, port: &str) -> Result<CertificateChain> {
        let target = Target::new(host, port)?;
        debug!(address = %target.address(), "connecting to TLS server");

        let cfg = ProbeConfig::unpinned(&target, self.timeout);
        let negotiated = handshake(&cfg, &self.cancel, peer_chain).await.required()?;
        let certificates = negotiated.inspected?;

        Ok(CertificateChain {
            host: target.host,
            port: target.port,
            tls_version: negotiated.protocol,
            cipher_suite: negotiated.cipher.unwrap_or_default(),
            certificates,
        })
    }
}

/// Reads the presented chain off a live session, leaf first.
fn peer_chain(ssl: &SslRef) -> Result<Vec<Certificate>> {
    let now = Utc::now();
    // On the client side the chain already starts with the leaf.
    if let Some(chain) = ssl.peer_cert_chain() {
        return chain
            .iter()
            .map(|cert| parse_certificate(cert, now))
            .collect();
    }
    match ssl.peer_certificate() {
        Some(leaf) => Ok(vec![parse_certificate(&leaf, now)?]),
        None => Ok(Vec::new()),
    }
}

/// Snapshot of one certificate. Validity problems and unreadable extensions
/// are logged, never raised.
pub fn parse_certificate(cert: &X509Ref, now: DateTime<Utc>) -> Result<Certificate> {
    let subject = distinguished_name(cert.subject_name());
    let issuer = distinguished_name(cert.issuer_name());
    let serial_number = cert
        .serial_number()
        .to_bn()
        .and_then(|bn| serial_hex(&bn))
        .unwrap_or_default();
    let not_before = certificate_time(cert.not_before(), "notBefore")?;
    let not_after = certificate_time(cert.not_after(), "notAfter")?;

    let signature_algorithm = {
        let object = cert.signature_algorithm().object();
        object
            .nid()
            .long_name()
            .map(str::to_string)
            .unwrap_or_else(|_| object.to_string())
    };
    let (public_key_algorithm, public_key_size) = public_key_info(cert);

    let dns_names = cert
        .subject_alt_names()
        .map(|names| {
            names
                .iter()
                .filter_map(|name| name.dnsname().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let is_ca = cert
        .to_der()
        .map(|der| ca_flag(&der, &subject.common_name))
        .unwrap_or_default();

    log_validity(&subject.common_name, not_before, not_after, now);

    Ok(Certificate {
        subject,
        issuer,
        serial_number,
        not_before,
        not_after,
        signature_algorithm,
        public_key_algorithm,
        public_key_size,
        dns_names,
        is_ca,
    })
}

fn certificate_time(time: &Asn1TimeRef, field: &'static str) -> Result<DateTime<Utc>> {
    asn1_to_utc(time).map_err(|source| ScanError::Certificate { field, source })
}

fn distinguished_name(name: &X509NameRef) -> DistinguishedName {
    let values = |nid: Nid| -> Vec<String> {
        name.entries_by_nid(nid)
            .filter_map(|entry| entry.data().as_utf8().ok())
            .map(|s| s.to_string())
            .collect()
    };

    DistinguishedName {
        common_name: values(Nid::COMMONNAME)
            .into_iter()
            .next()
            .unwrap_or_default(),
        organization: values(Nid::ORGANIZATIONNAME),
        organizational_unit: values(Nid::ORGANIZATIONALUNITNAME),
        country: values(Nid::COUNTRYNAME),
        province: values(Nid::STATEORPROVINCENAME),
        locality: values(Nid::LOCALITYNAME),
    }
}

/// Algorithm name and key size in bits: modulus length for RSA, curve degree
/// for EC, 256 for Ed25519.
fn public_key_info(cert: &X509Ref) -> (String, u32) {
    let Ok(key) = cert.public_key() else {
        return ("Unknown".into(), 0);
    };

    match key.id() {
        Id::RSA => {
            let bits = key.rsa().map(|rsa| rsa.n().num_bits()).unwrap_or(0);
            ("RSA".into(), u32::try_from(bits).unwrap_or(0))
        }
        Id::EC => {
            let bits = key.ec_key().map(|ec| ec.group().degree()).unwrap_or(0);
            ("ECDSA".into(), bits)
        }
        Id::ED25519 => ("Ed25519".into(), 256),
        Id::DSA => ("DSA".into(), key.bits()),
        _ => ("Unknown".into(), 0),
    }
}

/// CA flag from basic constraints. A certificate whose extensions cannot be
/// read is reported as not a CA.
fn ca_flag(der: &[u8], common_name: &str) -> bool {
    match basic_constraints_ca(der) {
        Ok(ca) => ca,
        Err(err) => {
            warn!(subject = common_name, error = %err, "unreadable certificate extensions");
            false
        }
    }
}

fn basic_constraints_ca(der: &[u8]) -> anyhow::Result<bool> {
    let (_, parsed) = X509Certificate::from_der(der)?;
    let constraints = parsed.basic_constraints()?;
    Ok(constraints.is_some_and(|ext| ext.value.ca))
}

fn log_validity(
    common_name: &str,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
) {
    match validity_state(not_before, not_after, now) {
        Validity::NotYetValid => {
            warn!(subject = common_name, %not_before, "certificate is not yet valid");
        }
        Validity::Expired => {
            warn!(subject = common_name, %not_after, "certificate has expired");
        }
        Validity::ExpiringSoon { days_remaining } => {
            warn!(subject = common_name, %not_after, days_remaining, "certificate expiring soon");
        }
        Validity::Valid => {}
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validity {
    NotYetValid,
    Expired,
    ExpiringSoon { days_remaining: i64 },
    Valid,
}

fn validity_state(
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Validity {
    if now < not_before {
        Validity::NotYetValid
    } else if now > not_after {
        Validity::Expired
    } else if now + ChronoDuration::days(EXPIRY_WARNING_DAYS) > not_after {
        Validity::ExpiringSoon {
            days_remaining: (not_after - now).num_days(),
        }
    } else {
        Validity::Valid
    }
}
