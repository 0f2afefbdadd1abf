//! Version sweep, cipher enumeration and the scans composed from them.
//!
//! Every probe runs to completion before the next one starts. Hammering one
//! endpoint with parallel handshakes tends to trip rate limits and skew the
//! results, so there is no fan-out here.

mod ciphers;
mod sweep;
#[cfg(test)]
pub(crate) mod testing;
mod vulns;

pub use vulns::{detect_vulnerabilities, merge_warnings};

use crate::error::Result;
use crate::model::{CipherSuiteTable, ScanMode, ScanReport, Target, TlsVersion};
use crate::probe::{OpensslProber, Prober};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

pub struct Scanner<P = OpensslProber> {
    timeout: Option<Duration>,
    prober: P,
    cancel: CancellationToken,
}

impl Scanner<OpensslProber> {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self::with_prober(timeout, OpensslProber)
    }
}

impl<P: Prober> Scanner<P> {
    pub fn with_prober(timeout: Option<Duration>, prober: P) -> Self {
        Self {
            timeout,
            prober,
            cancel: CancellationToken::new(),
        }
    }

    /// Checked before every probe and raced against the one in flight.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn scan(&self, host: &str, port: &str, mode: ScanMode) -> Result<ScanReport> {
        match mode {
            ScanMode::Versions => self.test_versions(host, port).await,
            ScanMode::Ciphers { include_tls13 } => {
                self.cipher_scan(host, port, include_tls13).await
            }
            ScanMode::Full => self.full_scan(host, port).await,
        }
    }

    /// Which versions negotiate, and the preferred one.
    #[instrument(skip(self))]
    pub async fn test_versions(&self, host: &str, port: &str) -> Result<ScanReport> {
        let target = Target::new(host, port)?;
        info!(address = %target.address(), timeout = ?self.timeout, "sweeping TLS versions");
        let table =
            sweep::sweep_versions(&self.prober, &target, self.timeout, &self.cancel).await?;
        Ok(ScanReport::new(&target, table))
    }

    /// Accepted suites for one version, named as in the sweep ("TLS 1.2").
    pub async fn enumerate_ciphers(
        &self,
        host: &str,
        port: &str,
        version: &str,
    ) -> Result<Vec<String>> {
        let version: TlsVersion = version.parse()?;
        let target = Target::new(host, port)?;
        ciphers::enumerate(&self.prober, &target, version, self.timeout, &self.cancel).await
    }

    /// Sweep, then enumerate suites for every supported version.
    ///
    /// TLS 1.3 enumeration only ever yields the server's pick, so callers that
    /// do not need it can save the round trip.
    #[instrument(skip(self))]
    pub async fn cipher_scan(
        &self,
        host: &str,
        port: &str,
        include_tls13: bool,
    ) -> Result<ScanReport> {
        let mut report = self.test_versions(host, port).await?;
        let target = Target::new(host, port)?;

        let mut table = CipherSuiteTable::new();
        for version in report.supported_versions.supported() {
            if version == TlsVersion::Tls13 && !include_tls13 {
                continue;
            }
            let suites =
                ciphers::enumerate(&self.prober, &target, version, self.timeout, &self.cancel)
                    .await?;
            table.insert(version, suites);
        }

        report.preferred_version = report.supported_versions.preferred();
        report.preferred_cipher = report
            .preferred_version
            .and_then(|v| table.get(&v))
            .and_then(|suites| suites.first().cloned());
        report.cipher_suites = (!table.is_empty()).then_some(table);
        Ok(report)
    }

    /// Cipher scan including TLS 1.3, plus configuration warnings.
    #[instrument(skip(self))]
    pub async fn full_scan(&self, host: &str, port: &str) -> Result<ScanReport> {
        let mut report = self.cipher_scan(host, port, true).await?;
        merge_warnings(&mut report.vulnerabilities, &report.supported_versions);
        info!(
            host = %report.host,
            preferred = ?report.preferred_version,
            warnings = report.vulnerabilities.len(),
            "full scan complete"
        );
        Ok(report)
    }
}
