//! Authenticity confidence scoring.
//!
//! A pure read-time computation over the chain: four independent 25-point
//! checks plus a separate completeness flag.  Nothing is cached; every call
//! re-walks the chain, so the verdict always reflects the ledger as it is
//! now.
//!
//! Stage *presence* is all that completeness asks for -- order, duplicates,
//! and skips are deliberately left unchecked, matching the permissive
//! workflow the ledger accepts on append.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::{Stage, SupplyChainEntry, TestVerdict, REQUIRED_STAGES};
use crate::index;
use crate::ledger::Ledger;
use crate::validator;

/// Weight of each of the four binary checks.
pub const POINTS_PER_CHECK: u8 = 25;

/// Minimum confidence for an authentic verdict.
pub const AUTHENTIC_THRESHOLD: u8 = 75;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Which checks contributed to the confidence score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Full-chain recomputation walk passed.
    pub chain_valid: bool,
    /// At least one entry carries a certification.
    pub certifications_valid: bool,
    /// At least one entry records a passing toxicity test.
    pub test_results_verified: bool,
    /// Every entry carries a non-empty signature tag.
    pub signatures_valid: bool,
    /// Required stages with no entry for this batch.
    pub missing_stages: Vec<Stage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticityReport {
    pub product_id: String,
    pub batch_id: String,
    pub is_authentic: bool,
    /// 0..=100 in steps of 25.
    pub confidence: u8,
    pub supply_chain_complete: bool,
    pub entry_count: usize,
    pub details: ScoreBreakdown,
}

impl AuthenticityReport {
    /// Zero-confidence report for a batch with no recorded provenance.
    fn unknown(product_id: &str, batch_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            batch_id: batch_id.to_string(),
            is_authentic: false,
            confidence: 0,
            supply_chain_complete: false,
            entry_count: 0,
            details: ScoreBreakdown {
                chain_valid: false,
                certifications_valid: false,
                test_results_verified: false,
                signatures_valid: false,
                missing_stages: REQUIRED_STAGES.to_vec(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a product batch's authenticity.
///
/// An unknown batch yields `confidence 0`, never an error.
pub fn verify(ledger: &Ledger, product_id: &str, batch_id: &str) -> AuthenticityReport {
    let entries = index::by_batch(ledger.blocks(), batch_id);
    if entries.is_empty() {
        debug!(batch_id, "no provenance entries; zero confidence");
        return AuthenticityReport::unknown(product_id, batch_id);
    }

    let chain_valid = validator::validate(ledger.blocks()).valid;
    let certifications_valid = entries.iter().any(|e| !e.certifications.is_empty());
    let test_results_verified = entries.iter().any(has_passing_toxicity_test);
    let signatures_valid = entries.iter().all(|e| !e.digital_signature.is_empty());

    let confidence = [
        chain_valid,
        certifications_valid,
        test_results_verified,
        signatures_valid,
    ]
    .iter()
    .filter(|&&check| check)
    .count() as u8
        * POINTS_PER_CHECK;

    let missing_stages: Vec<Stage> = REQUIRED_STAGES
        .into_iter()
        .filter(|required| !entries.iter().any(|e| e.stage == *required))
        .collect();
    let supply_chain_complete = missing_stages.is_empty();

    let is_authentic = confidence >= AUTHENTIC_THRESHOLD && supply_chain_complete;
    debug!(
        batch_id,
        confidence, supply_chain_complete, is_authentic, "batch scored"
    );

    AuthenticityReport {
        product_id: product_id.to_string(),
        batch_id: batch_id.to_string(),
        is_authentic,
        confidence,
        supply_chain_complete,
        entry_count: entries.len(),
        details: ScoreBreakdown {
            chain_valid,
            certifications_valid,
            test_results_verified,
            signatures_valid,
            missing_stages,
        },
    }
}

fn has_passing_toxicity_test(entry: &SupplyChainEntry) -> bool {
    entry
        .test_results
        .as_ref()
        .and_then(|t| t.toxicity_test.as_ref())
        .is_some_and(|check| check.result == TestVerdict::Passed)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{TestCheck, TestResults};

    fn fast_ledger() -> Ledger {
        Ledger::with_difficulty(1).unwrap()
    }

    fn entry(stage: Stage) -> SupplyChainEntry {
        SupplyChainEntry::new("p1", "b1", stage, "site", "auditor")
    }

    #[test]
    fn unknown_batch_scores_zero() {
        let ledger = fast_ledger();
        let report = verify(&ledger, "p1", "no-such-batch");
        assert!(!report.is_authentic);
        assert_eq!(report.confidence, 0);
        assert_eq!(report.entry_count, 0);
        assert_eq!(report.details.missing_stages.len(), 5);
    }

    #[test]
    fn partial_batch_high_confidence_but_not_authentic() {
        let mut ledger = fast_ledger();
        let mut e = entry(Stage::RawMaterials);
        e.certifications.insert("X".into());
        e.test_results = Some(TestResults {
            toxicity_test: Some(TestCheck::passed()),
            ..TestResults::default()
        });
        ledger.append(e).unwrap();

        let report = verify(&ledger, "p1", "b1");
        // All four checks pass, but four of five stages are missing.
        assert_eq!(report.confidence, 100);
        assert!(!report.supply_chain_complete);
        assert!(!report.is_authentic);
        assert_eq!(report.details.missing_stages.len(), 4);
    }

    #[test]
    fn complete_workflow_is_authentic() {
        let mut ledger = fast_ledger();
        ledger
            .append_batch_workflow("p1", "b1", &["ISO-9001".to_string()])
            .unwrap();

        let report = verify(&ledger, "p1", "b1");
        assert!(report.supply_chain_complete);
        assert_eq!(report.confidence, 100);
        assert!(report.is_authentic);
        assert_eq!(report.entry_count, 5);
    }

    #[test]
    fn confidence_quantized_to_quarter_steps() {
        let mut ledger = fast_ledger();
        // No certifications, no test results: expect exactly the chain and
        // signature points.
        ledger.append(entry(Stage::RawMaterials)).unwrap();
        let report = verify(&ledger, "p1", "b1");
        assert_eq!(report.confidence, 50);
        assert!([0u8, 25, 50, 75, 100].contains(&report.confidence));
    }

    #[test]
    fn failed_toxicity_test_earns_no_points() {
        let mut ledger = fast_ledger();
        let mut e = entry(Stage::QualityTesting);
        e.test_results = Some(TestResults {
            toxicity_test: Some(TestCheck::failed("lead above threshold")),
            ..TestResults::default()
        });
        ledger.append(e).unwrap();

        let report = verify(&ledger, "p1", "b1");
        assert!(!report.details.test_results_verified);
        assert_eq!(report.confidence, 50);
    }

    #[test]
    fn duplicate_and_out_of_order_stages_still_complete() {
        let mut ledger = fast_ledger();
        // Reverse order with a duplicate: completeness is presence-only.
        for stage in [
            Stage::Distribution,
            Stage::Packaging,
            Stage::QualityTesting,
            Stage::Manufacturing,
            Stage::RawMaterials,
            Stage::RawMaterials,
        ] {
            ledger.append(entry(stage)).unwrap();
        }
        let report = verify(&ledger, "p1", "b1");
        assert!(report.supply_chain_complete);
        assert_eq!(report.entry_count, 6);
    }

    #[test]
    fn retail_alone_does_not_complete_the_chain() {
        let mut ledger = fast_ledger();
        ledger.append(entry(Stage::Retail)).unwrap();
        let report = verify(&ledger, "p1", "b1");
        assert!(!report.supply_chain_complete);
        assert_eq!(report.details.missing_stages.len(), 5);
    }
}
