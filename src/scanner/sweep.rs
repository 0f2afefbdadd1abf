use crate::error::Result;
use crate::model::{ProbeConfig, Target, TlsVersion, VersionSupportTable};
use crate::probe::Prober;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Probes every known version once, oldest first, with no suite restriction.
///
/// The first hard failure aborts the sweep; a partially filled table is never
/// returned.
pub(crate) async fn sweep_versions<P: Prober + ?Sized>(
    prober: &P,
    target: &Target,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<VersionSupportTable> {
    let mut table = VersionSupportTable::new();

    for version in TlsVersion::ALL {
        let cfg = ProbeConfig::pinned(target, version, timeout);
        let supported = prober.probe(&cfg, cancel).await.accepted()?.is_some();
        debug!(host = %target.host, %version, supported, "version probed");
        table.set(version, supported);
    }

    Ok(table)
}
