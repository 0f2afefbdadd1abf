mod cli;

use clap::Parser;
use cli::Cli;
use tls_survey::inspect::CertificateInspector;
use tls_survey::model::Task;
use tls_survey::output::ReportWriter;
use tls_survey::scanner::Scanner;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = cli.into_config()?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling the scan");
                cancel.cancel();
            }
        });
    }

    let mut writer = ReportWriter::stdout(cfg.output);
    let target = &cfg.target;

    match cfg.task {
        Task::Certificate => {
            info!(
                host = %target.host,
                port = %target.port,
                timeout = ?cfg.timeout,
                "retrieving TLS certificate"
            );
            let chain = CertificateInspector::new(cfg.timeout)
                .with_cancellation(cancel)
                .fetch(&target.host, &target.port)
                .await?;
            writer.write_chain(&chain)?;
        }
        Task::Scan(mode) => {
            info!(host = %target.host, port = %target.port, ?mode, "scanning TLS configuration");
            let report = Scanner::new(cfg.timeout)
                .with_cancellation(cancel)
                .scan(&target.host, &target.port, mode)
                .await?;
            writer.write_scan(&report)?;
        }
    }

    Ok(())
}
