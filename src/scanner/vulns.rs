use crate::model::{TlsVersion, VersionSupportTable};

pub const DEPRECATED_TLS10: &str = "Server supports deprecated TLS 1.0";
pub const DEPRECATED_TLS11: &str = "Server supports deprecated TLS 1.1";
pub const NO_MODERN_TLS: &str = "Server does not support modern TLS (1.2+)";

type Rule = fn(&VersionSupportTable) -> Option<&'static str>;

const RULES: &[Rule] = &[
    |t| {
        let legacy = t.is_supported(TlsVersion::Tls10);
        legacy.then_some(DEPRECATED_TLS10)
    },
    |t| {
        let legacy = t.is_supported(TlsVersion::Tls11);
        legacy.then_some(DEPRECATED_TLS11)
    },
    |t| {
        let modern = t.is_supported(TlsVersion::Tls12) || t.is_supported(TlsVersion::Tls13);
        (!modern).then_some(NO_MODERN_TLS)
    },
];

/// Warnings for `table`, in rule order. Pure: no handshakes happen here.
pub fn detect_vulnerabilities(table: &VersionSupportTable) -> Vec<String> {
    let mut warnings = Vec::new();
    merge_warnings(&mut warnings, table);
    warnings
}

/// Appends the warnings for `table` to `existing`, skipping any message
/// already present.
pub fn merge_warnings(existing: &mut Vec<String>, table: &VersionSupportTable) {
    for message in RULES.iter().filter_map(|rule| rule(table)) {
        if !existing.iter().any(|m| m == message) {
            existing.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(supported: &[TlsVersion]) -> VersionSupportTable {
        supported.iter().map(|v| (*v, true)).collect()
    }

    #[test]
    fn modern_only_is_clean() {
        let t = table(&[TlsVersion::Tls12, TlsVersion::Tls13]);
        let warnings = detect_vulnerabilities(&t);
        assert!(warnings.is_empty());
    }

    #[test]
    fn legacy_only_trips_both_rules() {
        let warnings = detect_vulnerabilities(&table(&[TlsVersion::Tls10]));
        assert_eq!(warnings, vec![DEPRECATED_TLS10, NO_MODERN_TLS]);
    }

    #[test]
    fn legacy_alongside_modern_warns_in_rule_order() {
        let t = table(&[TlsVersion::Tls10, TlsVersion::Tls11, TlsVersion::Tls12]);
        let warnings = detect_vulnerabilities(&t);
        assert_eq!(warnings, vec![DEPRECATED_TLS10, DEPRECATED_TLS11]);
    }

    #[test]
    fn nothing_supported_is_not_modern() {
        let warnings = detect_vulnerabilities(&VersionSupportTable::new());
        assert_eq!(warnings, vec![NO_MODERN_TLS]);
    }

    #[test]
    fn detection_is_pure() {
        let t = table(&[TlsVersion::Tls11]);
        assert_eq!(detect_vulnerabilities(&t), detect_vulnerabilities(&t));
    }

    #[test]
    fn merging_twice_never_duplicates() {
        let t = table(&[TlsVersion::Tls10, TlsVersion::Tls11]);
        let mut warnings = Vec::new();
        merge_warnings(&mut warnings, &t);
        merge_warnings(&mut warnings, &t);
        assert_eq!(warnings.len(), 3);
    }
}
