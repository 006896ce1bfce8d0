//! Per-entry integrity tags.
//!
//! The "digital signature" carried by an entry is a truncated hash over
//! `stage + product_id + unix_millis` -- a collision-resistant tag that can
//! flag gross tampering of the tag field itself, nothing more.  There is no
//! secret key and no asymmetric verification, so it does NOT authenticate
//! the issuer.  A hardened deployment would replace this with a keyed MAC or
//! an asymmetric signature from a key-management collaborator; until then the
//! scheme is preserved as-is for compatibility.

use crate::entry::Stage;
use crate::util;

/// Hex characters kept from the SHA-256 digest.
pub const TAG_LEN: usize = 16;

/// Stamp a tag for an entry at the current instant.
pub fn sign(stage: Stage, product_id: &str) -> String {
    sign_at(stage, product_id, util::now_unix_millis())
}

/// Deterministic form: tag over an explicit millisecond timestamp.
pub fn sign_at(stage: Stage, product_id: &str, unix_millis: i128) -> String {
    let preimage = format!("{}{}{}", stage, product_id, unix_millis);
    let mut tag = util::sha256_hex(preimage.as_bytes());
    tag.truncate(TAG_LEN);
    tag
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
