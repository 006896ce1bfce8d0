//! Hashing helpers, time utilities, and input validation.

use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::{ProvError, Result};

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn now_unix_millis() -> i128 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos()) / 1_000_000
}

/// Parse an RFC 3339 timestamp into epoch seconds (fractional).
pub fn parse_rfc3339_secs(ts: &str) -> Result<f64> {
    let dt = OffsetDateTime::parse(ts, &Rfc3339)
        .map_err(|e| ProvError::Validation(format!("invalid RFC 3339 timestamp '{ts}': {e}")))?;
    Ok(dt.unix_timestamp_nanos() as f64 / 1e9)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Regex for product / batch identifiers: starts with alphanumeric, then up
/// to 127 more alphanumeric / hyphen / dot / underscore characters.
static ID_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-_.]{0,127}$").unwrap()
});

/// Validate a product or batch identifier format.
pub fn validate_id(id: &str, label: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ProvError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    if !ID_RE.is_match(id) {
        return Err(ProvError::Validation(format!(
            "invalid {label} '{}': 1-128 chars, alphanumeric/hyphen/dot/underscore",
            id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Version constants (set by build.rs)
// ---------------------------------------------------------------------------

pub const GIT_HASH: &str = env!("PROVCHAIN_GIT_HASH");
pub const BUILD_TS: &str = env!("PROVCHAIN_BUILD_TS");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One-line version string for display.
pub fn version_string() -> String {
    format!("provchain v{VERSION} (git {GIT_HASH}, built {BUILD_TS})")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
