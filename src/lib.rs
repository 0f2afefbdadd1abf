//! Discovers which TLS versions and cipher suites a server negotiates, flags
//! weak configurations, and fetches the presented certificate chain.

pub mod error;
pub mod inspect;
pub mod model;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod util;

pub use error::{Result, ScanError};
pub use inspect::CertificateInspector;
pub use model::{CipherSuiteTable, ScanMode, ScanReport, TlsVersion, VersionSupportTable};
pub use scanner::{detect_vulnerabilities, Scanner};
