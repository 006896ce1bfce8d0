//! Full-chain integrity validation.
//!
//! Walks the chain from index 1, recomputing each block's digest and
//! checking linkage against the predecessor's stored hash.  The walk
//! short-circuits at the first failure: once a block is bad, every later
//! recomputation is suspect anyway, and callers only need the offending
//! index to decide policy.  Genesis is trusted by construction and never
//! checked against a predecessor.
//!
//! Tamper detection is a reported condition, not an error.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec;
use crate::ledger::Block;

/// Outcome of a validation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainValidation {
    pub valid: bool,
    /// Index of the first block failing recomputation or linkage.
    pub first_invalid_index: Option<u64>,
}

impl ChainValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            first_invalid_index: None,
        }
    }

    fn failed_at(index: u64) -> Self {
        warn!(index, "chain validation failed");
        Self {
            valid: false,
            first_invalid_index: Some(index),
        }
    }
}

/// Recompute and verify every block after genesis.
pub fn validate(chain: &[Block]) -> ChainValidation {
    for (position, block) in chain.iter().enumerate().skip(1) {
        let expected = match codec::canonical_json(&block.data) {
            Ok(data_json) => codec::digest(
                block.index,
                &block.timestamp,
                &data_json,
                &block.previous_hash,
                block.nonce,
            ),
            // Unserializable data cannot match any stored hash.
            Err(_) => return ChainValidation::failed_at(block.index),
        };
        if expected != block.hash {
            return ChainValidation::failed_at(block.index);
        }
        if block.previous_hash != chain[position - 1].hash {
            return ChainValidation::failed_at(block.index);
        }
    }
    ChainValidation::ok()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Stage, SupplyChainEntry};
    use crate::ledger::Ledger;

    fn chain_of(n: usize) -> Vec<Block> {
        let mut ledger = Ledger::with_difficulty(1).unwrap();
        for i in 0..n {
            let entry = SupplyChainEntry::new(
                "p1",
                "b1",
                Stage::RawMaterials,
                format!("site-{i}"),
                "auditor",
            );
            ledger.append(entry).unwrap();
        }
        ledger.blocks().to_vec()
    }

    #[test]
    fn intact_chain_validates() {
        let chain = chain_of(4);
        let report = validate(&chain);
        assert!(report.valid);
        assert_eq!(report.first_invalid_index, None);
    }

    #[test]
    fn genesis_only_chain_validates() {
        let chain = chain_of(0);
        assert!(validate(&chain).valid);
    }

    #[test]
    fn data_tamper_reports_first_bad_index() {
        for k in 1..=3u64 {
            let mut chain = chain_of(3);
            chain[k as usize].data.location = "FORGED".into();
            let report = validate(&chain);
            assert!(!report.valid);
            assert_eq!(report.first_invalid_index, Some(k));
        }
    }

    #[test]
    fn broken_linkage_detected() {
        let mut chain = chain_of(3);
        chain[2].previous_hash = "f".repeat(64);
        let report = validate(&chain);
        assert!(!report.valid);
        assert_eq!(report.first_invalid_index, Some(2));
    }

    #[test]
    fn nonce_tamper_detected() {
        let mut chain = chain_of(2);
        chain[1].nonce += 1;
        assert_eq!(validate(&chain).first_invalid_index, Some(1));
    }

    #[test]
    fn timestamp_tamper_detected() {
        let mut chain = chain_of(2);
        chain[2].timestamp = "2000-01-01T00:00:00Z".into();
        assert_eq!(validate(&chain).first_invalid_index, Some(2));
    }
}
