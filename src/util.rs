use chrono::{DateTime, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::bn::BigNumRef;
use openssl::error::ErrorStack;

/// Uppercase hex without leading zeros, the way serials are usually quoted.
pub fn serial_hex(serial: &BigNumRef) -> Result<String, ErrorStack> {
    let hex = serial.to_hex_str()?;
    Ok(trim_hex(&hex))
}

pub fn trim_hex(hex: &str) -> String {
    let (sign, digits) = match hex.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", hex),
    };
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        format!("{sign}{}", trimmed.to_ascii_uppercase())
    }
}

/// Converts an ASN.1 time to UTC by diffing it against the Unix epoch.
pub fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, ErrorStack> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let secs = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    Ok(DateTime::from_timestamp(secs, 0).unwrap_or_default())
}
