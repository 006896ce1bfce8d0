//! Structured error types for the provchain library.
//!
//! Every public library function returns [`Result<T>`] which carries a
//! domain-specific [`ProvError`].  Tamper detection is deliberately *not* an
//! error: the validator reports it as a value (see [`crate::validator`]) and
//! callers decide policy.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Primary error enum
// ---------------------------------------------------------------------------

/// Domain-specific error type for the provchain library.
#[derive(Error, Debug)]
pub enum ProvError {
    #[error("ledger: {0}")]
    Ledger(String),

    #[error("mining: {0}")]
    Mining(String),

    #[error("snapshot: {0}")]
    Snapshot(String),

    #[error("config: {0}")]
    Config(String),

    /// Malformed input rejected before any block is constructed.
    #[error("validation: {0}")]
    Validation(String),

    /// Catch-all for errors that do not fit a specific domain.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, ProvError>;

// ---------------------------------------------------------------------------
// Context extension trait
// ---------------------------------------------------------------------------

/// Extension trait that adds domain-specific context to any `Result<T, E>`.
///
/// Usage mirrors `anyhow::Context` but tags the error with the originating
/// subsystem so that callers can categorise failures.
///
/// ```ignore
/// std::fs::read(path).ctx_snapshot("read snapshot file")?;
/// ```
pub trait ResultExt<T> {
    fn ctx_ledger(self, msg: &str) -> Result<T>;
    fn ctx_snapshot(self, msg: &str) -> Result<T>;
    fn ctx_config(self, msg: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn ctx_ledger(self, msg: &str) -> Result<T> {
        self.map_err(|e| ProvError::Ledger(format!("{msg}: {e}")))
    }
    fn ctx_snapshot(self, msg: &str) -> Result<T> {
        self.map_err(|e| ProvError::Snapshot(format!("{msg}: {e}")))
    }
    fn ctx_config(self, msg: &str) -> Result<T> {
        self.map_err(|e| ProvError::Config(format!("{msg}: {e}")))
    }
}
