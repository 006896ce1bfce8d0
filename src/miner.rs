//! Proof-of-work nonce search.
//!
//! Sealing is a blocking, CPU-bound loop on the calling thread: starting at
//! nonce 0, recompute the block digest until its first `difficulty` hex
//! characters are all `'0'`.  At the default difficulty of 4 that is an
//! expected ~16^4 = 65,536 digest evaluations per block.  There is no retry
//! or abandonment path; the only failure mode is exhausting the u64 nonce
//! space, which is reported rather than looping forever.

use tracing::trace;

use crate::codec;
use crate::error::{ProvError, Result};
use crate::ledger::Block;

/// Expected ~65,536 digest evaluations per block.
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Upper bound accepted from configuration.  Anything past this is
/// uninterruptible for hours and outside what the blocking design supports.
pub const MAX_DIFFICULTY: u32 = 16;

/// Does the hash carry a leading run of `difficulty` zero hex characters?
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let n = difficulty as usize;
    hash.len() >= n && hash.as_bytes()[..n].iter().all(|b| *b == b'0')
}

/// Find a nonce satisfying `difficulty` and write `nonce` + `hash` into the
/// block.  `index`, `timestamp`, `data`, and `previous_hash` are never
/// touched; in particular the timestamp fixed at block construction stays
/// fixed through the whole search.  Returns the number of digest
/// evaluations performed.
pub fn seal(block: &mut Block, difficulty: u32) -> Result<u64> {
    if difficulty > MAX_DIFFICULTY {
        return Err(ProvError::Mining(format!(
            "difficulty {difficulty} exceeds maximum {MAX_DIFFICULTY}"
        )));
    }
    let data_json = codec::canonical_json(&block.data)?;
    seal_in_range(block, &data_json, difficulty, 0, u64::MAX)
}

/// Search an explicit nonce range.  Split out so the exhaustion path is
/// testable without 2^64 iterations.
fn seal_in_range(
    block: &mut Block,
    data_json: &str,
    difficulty: u32,
    start: u64,
    end: u64,
) -> Result<u64> {
    let mut evaluations: u64 = 0;
    for nonce in start..=end {
        evaluations += 1;
        let hash = codec::digest(
            block.index,
            &block.timestamp,
            data_json,
            &block.previous_hash,
            nonce,
        );
        if meets_difficulty(&hash, difficulty) {
            trace!(index = block.index, nonce, evaluations, "block sealed");
            block.nonce = nonce;
            block.hash = hash;
            return Ok(evaluations);
        }
    }
    Err(ProvError::Mining(format!(
        "nonce space exhausted sealing block {} at difficulty {difficulty}",
        block.index
    )))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
