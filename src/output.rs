use crate::model::{CertificateChain, DistinguishedName, OutputFormat, ScanReport, TlsVersion};
use chrono::SecondsFormat;
use serde::Serialize;
use std::io::{BufWriter, Stdout, Write};

pub struct ReportWriter<W: Write = Stdout> {
    format: OutputFormat,
    writer: BufWriter<W>,
}

impl ReportWriter<Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, std::io::stdout())
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(format: OutputFormat, inner: W) -> Self {
        Self {
            format,
            writer: BufWriter::new(inner),
        }
    }

    pub fn write_scan(&mut self, report: &ScanReport) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(report)?,
            OutputFormat::Pretty => self.write_scan_text(report)?,
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_chain(&mut self, chain: &CertificateChain) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(chain)?,
            OutputFormat::Pretty => self.write_chain_text(chain)?,
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> anyhow::Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| anyhow::anyhow!("failed to flush report: {}", err.error()))
    }

    fn write_json<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, value)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_scan_text(&mut self, report: &ScanReport) -> std::io::Result<()> {
        let w = &mut self.writer;
        writeln!(w, "Host: {}:{}", report.host, report.port)?;

        writeln!(w, "\nSupported TLS Versions:")?;
        for version in TlsVersion::PRECEDENCE {
            let status = if report.supported_versions.is_supported(version) {
                "Yes"
            } else {
                "No"
            };
            writeln!(w, "  {version}: {status}")?;
        }

        if let Some(version) = report.preferred_version {
            writeln!(w, "\nPreferred Version: {version}")?;
        }

        if let Some(table) = report.cipher_suites.as_ref().filter(|t| !t.is_empty()) {
            writeln!(w, "\nSupported Cipher Suites:")?;
            for version in TlsVersion::PRECEDENCE {
                let Some(suites) = table.get(&version).filter(|s| !s.is_empty()) else {
                    continue;
                };
                writeln!(w, "\n  {version}:")?;
                for suite in suites {
                    writeln!(w, "    - {suite}")?;
                }
            }
        }

        if let Some(cipher) = &report.preferred_cipher {
            writeln!(w, "\nPreferred Cipher: {cipher}")?;
        }

        if !report.vulnerabilities.is_empty() {
            writeln!(w, "\nSecurity Warnings:")?;
            for warning in &report.vulnerabilities {
                writeln!(w, "  ! {warning}")?;
            }
        }

        Ok(())
    }

    fn write_chain_text(&mut self, chain: &CertificateChain) -> std::io::Result<()> {
        let w = &mut self.writer;
        writeln!(w, "Host: {}:{}", chain.host, chain.port)?;
        writeln!(w, "TLS Version: {}", chain.tls_version)?;
        writeln!(w, "Cipher Suite: {}", chain.cipher_suite)?;

        if chain.certificates.is_empty() {
            return Ok(());
        }

        writeln!(
            w,
            "\nCertificate Chain ({} certificates):",
            chain.certificates.len()
        )?;
        for (idx, cert) in chain.certificates.iter().enumerate() {
            writeln!(w, "\nCertificate #{}:", idx + 1)?;
            writeln!(w, "  Subject:")?;
            write_name(w, &cert.subject, true)?;
            writeln!(w, "  Issuer:")?;
            write_name(w, &cert.issuer, false)?;

            writeln!(w, "  Validity:")?;
            writeln!(
                w,
                "    Not Before: {}",
                cert.not_before.to_rfc3339_opts(SecondsFormat::Secs, true)
            )?;
            writeln!(
                w,
                "    Not After: {}",
                cert.not_after.to_rfc3339_opts(SecondsFormat::Secs, true)
            )?;

            writeln!(w, "  Serial Number: {}", cert.serial_number)?;
            writeln!(w, "  Signature Algorithm: {}", cert.signature_algorithm)?;
            writeln!(
                w,
                "  Public Key: {} ({} bits)",
                cert.public_key_algorithm, cert.public_key_size
            )?;

            if !cert.dns_names.is_empty() {
                writeln!(w, "  DNS Names:")?;
                for name in &cert.dns_names {
                    writeln!(w, "    - {name}")?;
                }
            }

            if cert.is_ca {
                writeln!(w, "  CA Certificate: Yes")?;
            }
        }

        Ok(())
    }
}

fn write_name<W: Write>(
    w: &mut W,
    name: &DistinguishedName,
    detailed: bool,
) -> std::io::Result<()> {
    writeln!(w, "    Common Name: {}", name.common_name)?;
    if !name.organization.is_empty() {
        writeln!(w, "    Organization: {}", name.organization.join(", "))?;
    }
    if !detailed {
        return Ok(());
    }
    if !name.organizational_unit.is_empty() {
        writeln!(
            w,
            "    Organizational Unit: {}",
            name.organizational_unit.join(", ")
        )?;
    }
    if !name.country.is_empty() {
        writeln!(w, "    Country: {}", name.country.join(", "))?;
    }
    Ok(())
}
