//! Supply-chain event payloads carried by ledger blocks.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::util;

// ---------------------------------------------------------------------------
// Lifecycle stages
// ---------------------------------------------------------------------------

/// Lifecycle tag for a provenance event.
///
/// The ordering below is the canonical workflow order, but the ledger does
/// not enforce it: entries may arrive for any stage, in any order, with
/// duplicates or skips.  Completeness is judged on presence only (see
/// [`crate::scoring`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RawMaterials,
    Manufacturing,
    QualityTesting,
    Packaging,
    Distribution,
    Retail,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RawMaterials => "raw_materials",
            Stage::Manufacturing => "manufacturing",
            Stage::QualityTesting => "quality_testing",
            Stage::Packaging => "packaging",
            Stage::Distribution => "distribution",
            Stage::Retail => "retail",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::error::ProvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw_materials" => Ok(Stage::RawMaterials),
            "manufacturing" => Ok(Stage::Manufacturing),
            "quality_testing" => Ok(Stage::QualityTesting),
            "packaging" => Ok(Stage::Packaging),
            "distribution" => Ok(Stage::Distribution),
            "retail" => Ok(Stage::Retail),
            other => Err(crate::error::ProvError::Validation(format!(
                "unknown stage '{other}'"
            ))),
        }
    }
}

/// The five stages a batch must pass through before retail for its supply
/// chain to count as complete.
pub const REQUIRED_STAGES: [Stage; 5] = [
    Stage::RawMaterials,
    Stage::Manufacturing,
    Stage::QualityTesting,
    Stage::Packaging,
    Stage::Distribution,
];

// ---------------------------------------------------------------------------
// Test results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestVerdict {
    Passed,
    Failed,
}

/// One pass/fail check recorded by a testing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCheck {
    pub result: TestVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TestCheck {
    pub fn passed() -> Self {
        Self {
            result: TestVerdict::Passed,
            notes: None,
        }
    }

    pub fn failed(notes: impl Into<String>) -> Self {
        Self {
            result: TestVerdict::Failed,
            notes: Some(notes.into()),
        }
    }
}

/// Structured quality-testing data.  Opaque to the chain itself; only the
/// scorer inspects it (and only the toxicity verdict).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toxicity_test: Option<TestCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durability_test: Option<TestCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_composition: Option<TestCheck>,
}

impl TestResults {
    /// All three checks passed; what a compliant QA lab reports.
    pub fn all_passed() -> Self {
        Self {
            toxicity_test: Some(TestCheck::passed()),
            durability_test: Some(TestCheck::passed()),
            material_composition: Some(TestCheck::passed()),
        }
    }
}

// ---------------------------------------------------------------------------
// Supply-chain entry
// ---------------------------------------------------------------------------

/// One provenance event: a single stage of a product batch's life.
///
/// A batch spans multiple entries (one per stage), each sealed into its own
/// block.  Field order is fixed by this struct declaration and is part of the
/// canonical serialization the block digest is computed over -- do not
/// reorder fields (see [`crate::codec`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyChainEntry {
    pub product_id: String,
    pub batch_id: String,
    pub stage: Stage,
    pub location: String,
    /// RFC 3339 event time.
    pub timestamp: String,
    /// Sorted set: iteration order is deterministic for hashing.
    pub certifications: BTreeSet<String>,
    pub verified_by: String,
    /// Truncated-hash integrity tag; stamped at append time when empty.
    /// NOT an authenticated signature (see [`crate::stamp`]).
    #[serde(default)]
    pub digital_signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<TestResults>,
}

impl SupplyChainEntry {
    /// Build an entry timestamped now, with no certifications, signature, or
    /// test results.  Callers fill in the optional fields before appending.
    pub fn new(
        product_id: impl Into<String>,
        batch_id: impl Into<String>,
        stage: Stage,
        location: impl Into<String>,
        verified_by: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            batch_id: batch_id.into(),
            stage,
            location: location.into(),
            timestamp: util::now_utc_rfc3339(),
            certifications: BTreeSet::new(),
            verified_by: verified_by.into(),
            digital_signature: String::new(),
            test_results: None,
        }
    }

    /// Reject malformed entries before any block is constructed.
    pub fn validate(&self) -> Result<()> {
        util::validate_id(&self.product_id, "product id")?;
        util::validate_id(&self.batch_id, "batch id")?;
        if self.location.trim().is_empty() {
            return Err(crate::error::ProvError::Validation(
                "location must not be empty".into(),
            ));
        }
        if self.verified_by.trim().is_empty() {
            return Err(crate::error::ProvError::Validation(
                "verified_by must not be empty".into(),
            ));
        }
        util::parse_rfc3339_secs(&self.timestamp)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
