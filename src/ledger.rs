//! Tamper-evident, hash-chained, append-only in-memory ledger.
//!
//! One [`Ledger`] per deployment, explicitly constructed and passed by
//! reference -- there is no process-wide singleton.  `append` takes
//! `&mut self`, so concurrent writers are ruled out at compile time; a
//! caller that shares the ledger across threads wraps it in its own lock or
//! actor and keeps the single-writer discipline that the linkage invariant
//! depends on.  All reads take `&self`.
//!
//! There is no built-in persistence.  [`export_snapshot_json`] /
//! [`import_snapshot_json`] give collaborators a durability hook; an import
//! re-validates the full chain before the ledger is handed back.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entry::{Stage, SupplyChainEntry, TestResults};
use crate::error::{ProvError, Result, ResultExt as _};
use crate::index;
use crate::miner;
use crate::stamp;
use crate::util;
use crate::validator;

pub const LEDGER_SCHEMA_VERSION: i64 = 1;
pub const SNAPSHOT_FORMAT: &str = "provchain-snapshot-v1";

/// Placeholder predecessor hash for the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// One sealed, hash-linked record carrying a single provenance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain; genesis is 0.
    pub index: u64,
    /// RFC 3339 instant the block was *constructed*.  Fixed before mining
    /// begins and never refreshed during the nonce search, or the stored
    /// hash would not match a later recomputation.
    pub timestamp: String,
    pub data: SupplyChainEntry,
    /// Hash of the preceding block; `"0"` for genesis.
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerMeta {
    pub ledger_id: Uuid,
    pub created_at_utc: String,
    pub schema_version: i64,
    /// Leading zero-hex-character proof-of-work target for appended blocks.
    pub difficulty: u32,
}

/// Summary counters for the surrounding service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerStats {
    pub total_blocks: usize,
    /// Distinct product ids, genesis excluded.
    pub total_products: usize,
    /// Distinct batch ids, genesis excluded.
    pub total_batches: usize,
    pub chain_valid: bool,
    pub last_block_hash: String,
    /// Mean inter-block construction-timestamp delta, in seconds.  Zero for
    /// a chain of fewer than two blocks.
    pub avg_block_time_secs: f64,
}

// ---------------------------------------------------------------------------
// Workflow constants
// ---------------------------------------------------------------------------

/// Fixed content for the five-stage convenience workflow, in append order.
/// Part of the behavioral contract with existing callers -- do not reorder.
const WORKFLOW_STAGES: [(Stage, &str, &str); 5] = [
    (Stage::RawMaterials, "sourcing-facility", "materials-auditor"),
    (Stage::Manufacturing, "manufacturing-plant", "production-supervisor"),
    (Stage::QualityTesting, "qa-laboratory", "qa-inspector"),
    (Stage::Packaging, "packaging-center", "packaging-supervisor"),
    (Stage::Distribution, "distribution-hub", "logistics-coordinator"),
];

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Ledger {
    meta: LedgerMeta,
    blocks: Vec<Block>,
}

impl Ledger {
    /// Create a ledger at the default difficulty.
    pub fn new() -> Self {
        // Default difficulty is well under MAX_DIFFICULTY.
        Self::with_difficulty(miner::DEFAULT_DIFFICULTY)
            .unwrap_or_else(|_| unreachable!("default difficulty is valid"))
    }

    /// Create a ledger mining at the given difficulty.
    ///
    /// The genesis block is *stamped*, not mined: its hash is computed once
    /// through the codec with nonce 0 over a fixed synthetic payload.  The
    /// validator trusts genesis by construction, so proof-of-work applies
    /// only from index 1 onward.
    pub fn with_difficulty(difficulty: u32) -> Result<Self> {
        if difficulty > miner::MAX_DIFFICULTY {
            return Err(ProvError::Config(format!(
                "difficulty {difficulty} exceeds maximum {}",
                miner::MAX_DIFFICULTY
            )));
        }

        let created_at_utc = util::now_utc_rfc3339();
        let mut genesis_entry = SupplyChainEntry::new(
            "GENESIS",
            "GENESIS",
            Stage::RawMaterials,
            "origin",
            "system",
        );
        genesis_entry.timestamp = created_at_utc.clone();
        genesis_entry.digital_signature = stamp::sign(Stage::RawMaterials, "GENESIS");

        let data_json = crate::codec::canonical_json(&genesis_entry)?;
        let hash = crate::codec::digest(0, &created_at_utc, &data_json, GENESIS_PREVIOUS_HASH, 0);
        let genesis = Block {
            index: 0,
            timestamp: created_at_utc.clone(),
            data: genesis_entry,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            hash,
            nonce: 0,
        };

        let meta = LedgerMeta {
            ledger_id: Uuid::new_v4(),
            created_at_utc,
            schema_version: LEDGER_SCHEMA_VERSION,
            difficulty,
        };
        info!(ledger_id = %meta.ledger_id, difficulty, "ledger initialized");
        Ok(Self {
            meta,
            blocks: vec![genesis],
        })
    }

    pub fn meta(&self) -> &LedgerMeta {
        &self.meta
    }

    pub fn difficulty(&self) -> u32 {
        self.meta.difficulty
    }

    /// Read-only view of the chain, insertion order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// O(1) access to the chain tail.
    pub fn latest(&self) -> &Block {
        self.blocks
            .last()
            .unwrap_or_else(|| unreachable!("chain always holds genesis"))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        // Never true: genesis is created at construction.
        self.blocks.is_empty()
    }

    /// Validate, seal, and push one entry; returns the new block's hash.
    ///
    /// The entry is rejected before mining if malformed.  A signature tag is
    /// stamped in when the caller supplied none.  On any error the chain is
    /// left untouched -- there is no partially appended block.
    pub fn append(&mut self, mut entry: SupplyChainEntry) -> Result<String> {
        entry.validate()?;
        if entry.digital_signature.is_empty() {
            entry.digital_signature = stamp::sign(entry.stage, &entry.product_id);
        }

        let mut block = Block {
            index: self.blocks.len() as u64,
            // Fixed here, before the nonce search starts.
            timestamp: util::now_utc_rfc3339(),
            data: entry,
            previous_hash: self.latest().hash.clone(),
            hash: String::new(),
            nonce: 0,
        };
        let evaluations = miner::seal(&mut block, self.meta.difficulty)?;
        debug!(
            index = block.index,
            nonce = block.nonce,
            evaluations,
            product_id = %block.data.product_id,
            stage = %block.data.stage,
            "block appended"
        );
        let hash = block.hash.clone();
        self.blocks.push(block);
        Ok(hash)
    }

    /// Append the five canonical pre-retail stages for one batch, in order.
    ///
    /// Every stage entry carries the supplied certificates; the
    /// quality-testing stage additionally records a full set of passing test
    /// results.  Returns the new block hashes in append order.
    pub fn append_batch_workflow(
        &mut self,
        product_id: &str,
        batch_id: &str,
        certificates: &[String],
    ) -> Result<Vec<String>> {
        util::validate_id(product_id, "product id")?;
        util::validate_id(batch_id, "batch id")?;

        let mut hashes = Vec::with_capacity(WORKFLOW_STAGES.len());
        for (stage, location, verified_by) in WORKFLOW_STAGES {
            let mut entry =
                SupplyChainEntry::new(product_id, batch_id, stage, location, verified_by);
            entry.certifications = certificates.iter().cloned().collect();
            if stage == Stage::QualityTesting {
                entry.test_results = Some(TestResults::all_passed());
            }
            hashes.push(self.append(entry)?);
        }
        info!(product_id, batch_id, blocks = hashes.len(), "batch workflow appended");
        Ok(hashes)
    }

    /// All entries for a product, ascending by event time.  Genesis excluded.
    pub fn product_history(&self, product_id: &str) -> Vec<SupplyChainEntry> {
        index::by_product(&self.blocks, product_id)
    }

    /// All entries for a batch, ascending by event time.  Genesis excluded.
    pub fn batch_history(&self, batch_id: &str) -> Vec<SupplyChainEntry> {
        index::by_batch(&self.blocks, batch_id)
    }

    /// Adopt an arbitrary chain without validation.  Exists so tamper
    /// scenarios can be exercised end to end in tests; not part of the
    /// public contract.
    #[doc(hidden)]
    pub fn from_raw_parts(meta: LedgerMeta, blocks: Vec<Block>) -> Self {
        Self { meta, blocks }
    }

    /// Summary counters over the whole chain.
    pub fn stats(&self) -> Result<LedgerStats> {
        let mut products: HashSet<&str> = HashSet::new();
        let mut batches: HashSet<&str> = HashSet::new();
        for block in self.blocks.iter().skip(1) {
            products.insert(&block.data.product_id);
            batches.insert(&block.data.batch_id);
        }

        let mut avg_block_time_secs = 0.0;
        if self.blocks.len() > 1 {
            let mut prev = util::parse_rfc3339_secs(&self.blocks[0].timestamp)?;
            let mut total = 0.0;
            for block in &self.blocks[1..] {
                let ts = util::parse_rfc3339_secs(&block.timestamp)?;
                total += ts - prev;
                prev = ts;
            }
            avg_block_time_secs = total / (self.blocks.len() - 1) as f64;
        }

        Ok(LedgerStats {
            total_blocks: self.blocks.len(),
            total_products: products.len(),
            total_batches: batches.len(),
            chain_valid: validator::validate(&self.blocks).valid,
            last_block_hash: self.latest().hash.clone(),
            avg_block_time_secs,
        })
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Snapshot export / import
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct LedgerSnapshot {
    format: String,
    exported_at_utc: String,
    meta: LedgerMeta,
    blocks: Vec<Block>,
}

/// Export the full ledger (meta + blocks) to a JSON file.
pub fn export_snapshot_json(ledger: &Ledger, out_path: &Path) -> Result<()> {
    let snapshot = LedgerSnapshot {
        format: SNAPSHOT_FORMAT.to_string(),
        exported_at_utc: util::now_utc_rfc3339(),
        meta: ledger.meta().clone(),
        blocks: ledger.blocks().to_vec(),
    };
    let json = serde_json::to_vec_pretty(&snapshot).ctx_snapshot("serialize snapshot")?;
    std::fs::write(out_path, json)
        .map_err(|e| ProvError::Snapshot(format!("write {}: {e}", out_path.display())))?;
    info!(path = %out_path.display(), blocks = ledger.len(), "snapshot exported");
    Ok(())
}

/// Restore a ledger from a JSON snapshot.
///
/// The whole chain is re-validated before the ledger is returned, so a
/// snapshot tampered with at rest is rejected here rather than silently
/// resurrected.
pub fn import_snapshot_json(json_path: &Path) -> Result<Ledger> {
    let bytes = std::fs::read(json_path)
        .map_err(|e| ProvError::Snapshot(format!("read {}: {e}", json_path.display())))?;
    let snapshot: LedgerSnapshot =
        serde_json::from_slice(&bytes).ctx_snapshot("parse snapshot JSON")?;

    if snapshot.format != SNAPSHOT_FORMAT {
        return Err(ProvError::Snapshot(format!(
            "unsupported snapshot format '{}' (expected {SNAPSHOT_FORMAT})",
            snapshot.format
        )));
    }
    if snapshot.meta.schema_version != LEDGER_SCHEMA_VERSION {
        return Err(ProvError::Snapshot(format!(
            "unsupported schema_version {} (expected {LEDGER_SCHEMA_VERSION})",
            snapshot.meta.schema_version
        )));
    }

    let genesis = snapshot
        .blocks
        .first()
        .ok_or_else(|| ProvError::Snapshot("snapshot holds no blocks".into()))?;
    if genesis.index != 0 || genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ProvError::Snapshot(
            "snapshot genesis block is malformed".into(),
        ));
    }
    for (position, block) in snapshot.blocks.iter().enumerate() {
        if block.index != position as u64 {
            return Err(ProvError::Snapshot(format!(
                "block at position {position} carries index {}",
                block.index
            )));
        }
    }

    let report = validator::validate(&snapshot.blocks);
    if !report.valid {
        return Err(ProvError::Snapshot(format!(
            "snapshot chain fails validation at index {}",
            report
                .first_invalid_index
                .map(|i| i.to_string())
                .unwrap_or_else(|| "?".into())
        )));
    }

    info!(
        ledger_id = %snapshot.meta.ledger_id,
        blocks = snapshot.blocks.len(),
        "snapshot imported and verified"
    );
    Ok(Ledger {
        meta: snapshot.meta,
        blocks: snapshot.blocks,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Stage;

    fn fast_ledger() -> Ledger {
        Ledger::with_difficulty(1).unwrap()
    }

    fn entry(product: &str, batch: &str, stage: Stage) -> SupplyChainEntry {
        SupplyChainEntry::new(product, batch, stage, "site-1", "auditor-1")
    }

    #[test]
    fn genesis_invariants() {
        let ledger = fast_ledger();
        let genesis = &ledger.blocks()[0];
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.data.product_id, "GENESIS");
        // Stamped, not mined: the hash still recomputes through the codec.
        let data_json = crate::codec::canonical_json(&genesis.data).unwrap();
        let recomputed = crate::codec::digest(
            0,
            &genesis.timestamp,
            &data_json,
            &genesis.previous_hash,
            0,
        );
        assert_eq!(recomputed, genesis.hash);
    }

    #[test]
    fn append_links_and_indexes() {
        let mut ledger = fast_ledger();
        let h1 = ledger.append(entry("p1", "b1", Stage::RawMaterials)).unwrap();
        let h2 = ledger.append(entry("p1", "b1", Stage::Manufacturing)).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.latest().hash, h2);
        let blocks = ledger.blocks();
        assert_eq!(blocks[1].hash, h1);
        assert_eq!(blocks[1].previous_hash, blocks[0].hash);
        assert_eq!(blocks[2].previous_hash, h1);
        for (i, b) in blocks.iter().enumerate() {
            assert_eq!(b.index, i as u64);
        }
    }

    #[test]
    fn append_stamps_missing_signature() {
        let mut ledger = fast_ledger();
        ledger.append(entry("p1", "b1", Stage::RawMaterials)).unwrap();
        let tag = &ledger.latest().data.digital_signature;
        assert_eq!(tag.len(), stamp::TAG_LEN);
    }

    #[test]
    fn append_preserves_caller_signature() {
        let mut ledger = fast_ledger();
        let mut e = entry("p1", "b1", Stage::RawMaterials);
        e.digital_signature = "caller-supplied-tag".into();
        ledger.append(e).unwrap();
        assert_eq!(ledger.latest().data.digital_signature, "caller-supplied-tag");
    }

    #[test]
    fn malformed_entry_leaves_chain_untouched() {
        let mut ledger = fast_ledger();
        let mut bad = entry("p1", "b1", Stage::RawMaterials);
        bad.product_id = "has space".into();
        assert!(ledger.append(bad).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn fresh_ledger_stats() {
        let ledger = fast_ledger();
        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total_blocks, 1);
        assert_eq!(stats.total_products, 0);
        assert_eq!(stats.total_batches, 0);
        assert!(stats.chain_valid);
        assert_eq!(stats.last_block_hash, ledger.latest().hash);
        assert_eq!(stats.avg_block_time_secs, 0.0);
    }

    #[test]
    fn stats_count_distinct_products_and_batches() {
        let mut ledger = fast_ledger();
        ledger.append(entry("p1", "b1", Stage::RawMaterials)).unwrap();
        ledger.append(entry("p1", "b1", Stage::Manufacturing)).unwrap();
        ledger.append(entry("p2", "b2", Stage::RawMaterials)).unwrap();
        let stats = ledger.stats().unwrap();
        assert_eq!(stats.total_blocks, 4);
        assert_eq!(stats.total_products, 2);
        assert_eq!(stats.total_batches, 2);
        assert!(stats.avg_block_time_secs >= 0.0);
    }

    #[test]
    fn workflow_appends_five_stages_in_order() {
        let mut ledger = fast_ledger();
        let hashes = ledger
            .append_batch_workflow("p1", "b1", &["ISO-9001".to_string()])
            .unwrap();
        assert_eq!(hashes.len(), 5);
        assert_eq!(ledger.len(), 6);

        let stages: Vec<Stage> = ledger.blocks()[1..].iter().map(|b| b.data.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::RawMaterials,
                Stage::Manufacturing,
                Stage::QualityTesting,
                Stage::Packaging,
                Stage::Distribution,
            ]
        );
        for block in &ledger.blocks()[1..] {
            assert!(block.data.certifications.contains("ISO-9001"));
            assert!(!block.data.digital_signature.is_empty());
        }
        let qa = &ledger.blocks()[3].data;
        assert_eq!(qa.stage, Stage::QualityTesting);
        assert!(qa.test_results.is_some());
    }

    #[test]
    fn excessive_difficulty_rejected_at_construction() {
        assert!(Ledger::with_difficulty(miner::MAX_DIFFICULTY + 1).is_err());
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = fast_ledger();
        ledger.append(entry("p1", "b1", Stage::RawMaterials)).unwrap();
        ledger.append(entry("p1", "b1", Stage::Manufacturing)).unwrap();
        export_snapshot_json(&ledger, &path).unwrap();

        let restored = import_snapshot_json(&path).unwrap();
        assert_eq!(restored.meta().ledger_id, ledger.meta().ledger_id);
        assert_eq!(restored.blocks(), ledger.blocks());
    }

    #[test]
    fn tampered_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let mut ledger = fast_ledger();
        ledger.append(entry("p1", "b1", Stage::RawMaterials)).unwrap();
        export_snapshot_json(&ledger, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let tampered = text.replace("site-1", "site-FORGED");
        std::fs::write(&path, tampered).unwrap();

        let err = import_snapshot_json(&path).unwrap_err();
        assert!(err.to_string().contains("fails validation"));
    }

    #[test]
    fn corrupt_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, b"not json at all").unwrap();
        assert!(import_snapshot_json(&path).is_err());
    }
}
