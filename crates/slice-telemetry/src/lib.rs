//! NetSlice Telemetry
//!
//! Turns raw switch counters into per-slice rate estimates, keeps a
//! bounded metric history, and exports metric records as NDJSON files
//! plus a best-effort HTTP feed.
//!
//! Counter differentiation handles the awkward cases: first-sample
//! bootstrap, counter resets after switch restarts, and scheduling
//! jitter in the poll interval.

#![warn(missing_docs)]

pub mod counters;
pub mod export;
pub mod history;
pub mod ingest;

pub use counters::{BandwidthEngine, FlowStatsEntry, SliceThroughput};
pub use export::{FlowMetricRecord, MetricExporter};
pub use history::{MetricHistory, SliceSummary};
pub use ingest::{FixedLatency, JitterDerivedLatency, LatencyEstimator, TransferReport};

use thiserror::Error;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Transfer report missing required fields
    #[error("malformed transfer report: {0}")]
    MalformedReport(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// HTTP export error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;
