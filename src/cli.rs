use clap::{ArgAction, Parser, ValueEnum};
use std::fmt;
use std::time::Duration;
use tls_survey::model::{Config, OutputFormat, ScanMode, Target, Task};

#[derive(Debug, Parser)]
#[command(author, version, about = "TLS version, cipher and certificate survey", long_about = None)]
pub struct Cli {
    /// Host to connect to
    #[arg(value_name = "HOST")]
    pub host: String,

    /// Port to connect to
    #[arg(short = 'p', long = "port", default_value = Target::DEFAULT_PORT)]
    pub port: String,

    /// Per-handshake timeout in seconds (0 disables it)
    #[arg(short = 't', long = "timeout", default_value_t = 10)]
    pub timeout_secs: u64,

    /// What to do with the host
    #[arg(long = "mode", default_value_t = Mode::Certificate)]
    pub mode: Mode,

    /// Skip TLS 1.3 enumeration in cipher mode
    #[arg(long = "skip-tls13", action = ArgAction::SetTrue)]
    pub skip_tls13: bool,

    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = Format::Pretty)]
    pub output: Format,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Mode {
    /// Fetch and show the certificate chain
    Certificate,
    /// Sweep protocol versions
    Versions,
    /// Sweep versions and enumerate cipher suites
    Ciphers,
    /// Versions, ciphers and configuration warnings
    Full,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Certificate => write!(f, "certificate"),
            Mode::Versions => write!(f, "versions"),
            Mode::Ciphers => write!(f, "ciphers"),
            Mode::Full => write!(f, "full"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Pretty,
    Json,
}

impl Cli {
    pub fn into_config(self) -> anyhow::Result<Config> {
        if self.skip_tls13 && self.mode != Mode::Ciphers {
            anyhow::bail!("--skip-tls13 only applies to --mode ciphers");
        }

        let target = Target::new(self.host, self.port)?;
        let timeout = (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs));

        let task = match self.mode {
            Mode::Certificate => Task::Certificate,
            Mode::Versions => Task::Scan(ScanMode::Versions),
            Mode::Ciphers => Task::Scan(ScanMode::Ciphers {
                include_tls13: !self.skip_tls13,
            }),
            Mode::Full => Task::Scan(ScanMode::Full),
        };

        Ok(Config {
            target,
            timeout,
            task,
            output: match self.output {
                Format::Pretty => OutputFormat::Pretty,
                Format::Json => OutputFormat::Json,
            },
        })
    }
}
