//! Canonical serialization and block digesting.
//!
//! The digest is SHA-256 over the UTF-8 concatenation of
//! `index + timestamp + canonical_json(data) + previous_hash + nonce`.
//! Determinism is the whole contract here: the validator recomputes digests
//! long after sealing, so identical inputs must always yield identical
//! output.  Key order in the JSON payload is fixed by struct field order and
//! a sorted certification set, never by incidental map iteration order.

use crate::entry::SupplyChainEntry;
use crate::error::{Result, ResultExt as _};
use crate::util;

/// Serialize an entry to its canonical JSON form.
///
/// serde_json emits struct fields in declaration order and
/// `BTreeSet<String>` certifications in sorted order, so the output is
/// stable across runs and platforms.
pub fn canonical_json(entry: &SupplyChainEntry) -> Result<String> {
    serde_json::to_string(entry).ctx_ledger("serialize entry to canonical JSON")
}

/// Compute the hex digest over a block's fields.
pub fn digest(
    index: u64,
    timestamp: &str,
    data_json: &str,
    previous_hash: &str,
    nonce: u64,
) -> String {
    let mut preimage = String::with_capacity(
        20 + timestamp.len() + data_json.len() + previous_hash.len() + 20,
    );
    preimage.push_str(&index.to_string());
    preimage.push_str(timestamp);
    preimage.push_str(data_json);
    preimage.push_str(previous_hash);
    preimage.push_str(&nonce.to_string());
    util::sha256_hex(preimage.as_bytes())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
