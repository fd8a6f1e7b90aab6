//! NetSlice SLA Engine
//!
//! Compares per-slice metric samples against SLA thresholds, grades
//! violations by severity, and keeps a running violation ledger.
//!
//! Bandwidth is a minimum-bound dimension (equality is compliant);
//! latency, jitter, and packet loss are maximum-bound dimensions.

#![warn(missing_docs)]

pub mod evaluator;
pub mod violation;

pub use evaluator::{SlaCheck, SlaEvaluator};
pub use violation::{Severity, SlaViolation, ViolationSummary, ViolationType};

use thiserror::Error;

/// SLA engine errors
#[derive(Error, Debug)]
pub enum SlaError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for SLA engine operations
pub type Result<T> = std::result::Result<T, SlaError>;
