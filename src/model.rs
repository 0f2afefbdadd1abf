use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The protocol versions the scanner knows how to pin.
///
/// Declaration order is the sweep order, so `Ord` sorts oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "TLS 1.0")]
    Tls10,
    #[serde(rename = "TLS 1.1")]
    Tls11,
    #[serde(rename = "TLS 1.2")]
    Tls12,
    #[serde(rename = "TLS 1.3")]
    Tls13,
}

impl TlsVersion {
    /// Sweep order.
    pub const ALL: [TlsVersion; 4] = [
        TlsVersion::Tls10,
        TlsVersion::Tls11,
        TlsVersion::Tls12,
        TlsVersion::Tls13,
    ];

    /// Preference order, most desirable first.
    pub const PRECEDENCE: [TlsVersion; 4] = [
        TlsVersion::Tls13,
        TlsVersion::Tls12,
        TlsVersion::Tls11,
        TlsVersion::Tls10,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLS 1.0",
            TlsVersion::Tls11 => "TLS 1.1",
            TlsVersion::Tls12 => "TLS 1.2",
            TlsVersion::Tls13 => "TLS 1.3",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TlsVersion::ALL.into_iter().find(|v| v.name() == name)
    }

    /// Maps OpenSSL's `SSL_get_version` strings ("TLSv1.2") onto known versions.
    pub fn from_openssl(label: &str) -> Option<Self> {
        match label {
            "TLSv1" => Some(TlsVersion::Tls10),
            "TLSv1.1" => Some(TlsVersion::Tls11),
            "TLSv1.2" => Some(TlsVersion::Tls12),
            "TLSv1.3" => Some(TlsVersion::Tls13),
            _ => None,
        }
    }

    /// TLS 1.0 and 1.1 only handshake with security level 0 on OpenSSL 3.
    pub fn is_legacy(self) -> bool {
        self < TlsVersion::Tls12
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TlsVersion {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || ScanError::Configuration(format!("unsupported TLS version {s}"));
        TlsVersion::from_name(s).ok_or_else(unsupported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub host: String,
    pub port: String,
}

impl Target {
    pub const DEFAULT_PORT: &'static str = "443";

    /// Validates a host/port pair. An empty port falls back to 443.
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Result<Self> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(ScanError::Configuration("host is required".into()));
        }

        let mut port = port.into().trim().to_string();
        if port.is_empty() {
            port = Self::DEFAULT_PORT.to_string();
        }
        match port.parse::<u16>() {
            Ok(p) if p > 0 => {}
            _ => return Err(ScanError::Configuration(format!("invalid port {port}"))),
        }

        Ok(Self { host, port })
    }

    /// `host:port`, bracketing bare IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Host as sent in SNI, without IPv6 brackets.
    pub fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }
}

/// One cipher suite the enumerator can offer on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherCandidate {
    /// Registered name, reported in results.
    pub iana: &'static str,
    /// OpenSSL cipher-list spelling, used to restrict the offer.
    pub openssl: &'static str,
}

/// Parameters for a single handshake attempt. Certificate verification is
/// never enabled.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub target: Target,
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
    pub cipher: Option<&'static CipherCandidate>,
    pub timeout: Option<Duration>,
}

impl ProbeConfig {
    pub fn pinned(target: &Target, version: TlsVersion, timeout: Option<Duration>) -> Self {
        Self {
            target: target.clone(),
            min_version: Some(version),
            max_version: Some(version),
            cipher: None,
            timeout,
        }
    }

    pub fn unpinned(target: &Target, timeout: Option<Duration>) -> Self {
        Self {
            target: target.clone(),
            min_version: None,
            max_version: None,
            cipher: None,
            timeout,
        }
    }

    pub fn with_cipher(mut self, cipher: &'static CipherCandidate) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// A zero timeout means "no timeout", leaving cancellation as the only bound.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }
}

/// Support flag for every known version. Always holds all four keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VersionSupportTable(BTreeMap<TlsVersion, bool>);

impl Default for VersionSupportTable {
    fn default() -> Self {
        Self(TlsVersion::ALL.into_iter().map(|v| (v, false)).collect())
    }
}

impl VersionSupportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, version: TlsVersion, supported: bool) {
        self.0.insert(version, supported);
    }

    pub fn is_supported(&self, version: TlsVersion) -> bool {
        self.0.get(&version).copied().unwrap_or(false)
    }

    /// Supported versions in sweep order.
    pub fn supported(&self) -> impl Iterator<Item = TlsVersion> + '_ {
        self.0.iter().filter(|(_, ok)| **ok).map(|(v, _)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TlsVersion, bool)> + '_ {
        self.0.iter().map(|(v, ok)| (*v, *ok))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-precedence supported version.
    pub fn preferred(&self) -> Option<TlsVersion> {
        TlsVersion::PRECEDENCE
            .into_iter()
            .find(|v| self.is_supported(*v))
    }
}

impl FromIterator<(TlsVersion, bool)> for VersionSupportTable {
    fn from_iter<I: IntoIterator<Item = (TlsVersion, bool)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (version, supported) in iter {
            table.set(version, supported);
        }
        table
    }
}

/// Accepted suites per supported version, in candidate order.
pub type CipherSuiteTable = BTreeMap<TlsVersion, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Versions,
    Ciphers { include_tls13: bool },
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub host: String,
    pub port: String,
    pub supported_versions: VersionSupportTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher_suites: Option<CipherSuiteTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_version: Option<TlsVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_cipher: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vulnerabilities: Vec<String>,
}

impl ScanReport {
    pub fn new(target: &Target, supported_versions: VersionSupportTable) -> Self {
        let preferred_version = supported_versions.preferred();
        Self {
            host: target.host.clone(),
            port: target.port.clone(),
            supported_versions,
            cipher_suites: None,
            preferred_version,
            preferred_cipher: None,
            vulnerabilities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinguishedName {
    pub common_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organization: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizational_unit: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub country: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub province: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locality: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub signature_algorithm: String,
    pub public_key_algorithm: String,
    pub public_key_size: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
    #[serde(rename = "isCA")]
    pub is_ca: bool,
}

/// What a single unpinned connection revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateChain {
    pub host: String,
    pub port: String,
    pub tls_version: String,
    pub cipher_suite: String,
    pub certificates: Vec<Certificate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Certificate,
    Scan(ScanMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Pretty => write!(f, "pretty"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub target: Target,
    pub timeout: Option<Duration>,
    pub task: Task,
    pub output: OutputFormat,
}
