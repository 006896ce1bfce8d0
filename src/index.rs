//! Provenance queries over the chain.
//!
//! Baseline implementation is a linear scan with field-equality filtering,
//! O(n) per query.  At the intended scale (one ledger per deployment,
//! entries in the thousands) this is fine; a deployment that outgrows it
//! would maintain incremental `product_id -> block index` maps updated at
//! append time instead of rescanning.

use crate::entry::SupplyChainEntry;
use crate::ledger::Block;
use crate::util;

/// All entries for a product, ascending by event timestamp.
pub fn by_product(chain: &[Block], product_id: &str) -> Vec<SupplyChainEntry> {
    collect(chain, |e| e.product_id == product_id)
}

/// All entries for a batch, ascending by event timestamp.
pub fn by_batch(chain: &[Block], batch_id: &str) -> Vec<SupplyChainEntry> {
    collect(chain, |e| e.batch_id == batch_id)
}

fn collect<F>(chain: &[Block], matches: F) -> Vec<SupplyChainEntry>
where
    F: Fn(&SupplyChainEntry) -> bool,
{
    // Genesis carries a synthetic payload and is never a query result.
    let mut keyed: Vec<(f64, SupplyChainEntry)> = chain
        .iter()
        .skip(1)
        .map(|b| &b.data)
        .filter(|e| matches(e))
        .map(|e| {
            let key = util::parse_rfc3339_secs(&e.timestamp).unwrap_or(f64::MAX);
            (key, e.clone())
        })
        .collect();
    // Stable sort: ties keep chain order.
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, e)| e).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
