//! Provenance Ledger Engine (provchain)
//!
//! This crate provides:
//! - An append-only, hash-chained, in-memory ledger of supply-chain events
//! - Proof-of-work sealing of each block (leading-zero hex difficulty)
//! - Full-chain integrity validation with first-failure reporting
//! - Product / batch provenance queries ordered by event time
//! - An authenticity confidence score combining chain integrity,
//!   certifications, test results, and entry signature tags
//! - JSON snapshot export/import for callers that want durability
//!
//! The ledger is a plain owned value: `append` takes `&mut self`, so the
//! borrow checker enforces the single-writer discipline, and all query
//! surfaces take `&self`. There is no hidden global instance.
//!
//! The CLI wrapper lives in `src/main.rs`.

#![deny(unsafe_code)]

pub mod error;
pub mod config;

pub mod codec;
pub mod entry;
pub mod index;
pub mod ledger;
pub mod miner;
pub mod scoring;
pub mod stamp;
pub mod util;
pub mod validator;
