use anyhow::Result;
use tempfile::tempdir;

use provchain_core::{
    entry::{Stage, SupplyChainEntry},
    ledger::{self, Ledger},
    scoring,
};

#[test]
fn malformed_entries_rejected_before_mining() -> Result<()> {
    let mut ledger = Ledger::with_difficulty(1)?;

    let mut no_product = SupplyChainEntry::new("p1", "b1", Stage::RawMaterials, "site", "auditor");
    no_product.product_id.clear();
    assert!(ledger.append(no_product).unwrap_err().to_string().contains("validation"));

    let bad_batch = SupplyChainEntry::new("p1", "batch with spaces", Stage::RawMaterials, "site", "auditor");
    assert!(ledger.append(bad_batch).is_err());

    let no_verifier = SupplyChainEntry::new("p1", "b1", Stage::RawMaterials, "site", "  ");
    assert!(ledger.append(no_verifier).is_err());

    // Nothing was committed.
    assert_eq!(ledger.len(), 1);
    Ok(())
}

#[test]
fn unknown_batch_yields_zero_confidence_not_error() -> Result<()> {
    let ledger = Ledger::with_difficulty(1)?;
    let report = scoring::verify(&ledger, "ghost-product", "ghost-batch");
    assert!(!report.is_authentic);
    assert_eq!(report.confidence, 0);
    Ok(())
}

#[test]
fn unknown_product_history_is_empty() -> Result<()> {
    let ledger = Ledger::with_difficulty(1)?;
    assert!(ledger.product_history("ghost").is_empty());
    assert!(ledger.batch_history("ghost").is_empty());
    Ok(())
}

#[test]
fn corrupt_snapshot_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("corrupt.json");
    std::fs::write(&path, b"not-a-snapshot")?;

    let err = ledger::import_snapshot_json(&path).unwrap_err();
    assert!(err.to_string().contains("snapshot"));
    Ok(())
}

#[test]
fn wrong_snapshot_format_rejected() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ledger.json");

    let ledger = Ledger::with_difficulty(1)?;
    ledger::export_snapshot_json(&ledger, &path)?;

    let text = std::fs::read_to_string(&path)?;
    let downgraded = text.replace("provchain-snapshot-v1", "provchain-snapshot-v0");
    std::fs::write(&path, downgraded)?;

    let err = ledger::import_snapshot_json(&path).unwrap_err();
    assert!(err.to_string().contains("unsupported snapshot format"));
    Ok(())
}

#[test]
fn workflow_with_bad_ids_appends_nothing() -> Result<()> {
    let mut ledger = Ledger::with_difficulty(1)?;
    assert!(ledger
        .append_batch_workflow("valid-product", "bad batch!", &[])
        .is_err());
    assert_eq!(ledger.len(), 1);
    Ok(())
}
