//! NetSlice Controller
//!
//! Ties the slicing control plane together: a tagged-variant event
//! router over an explicit queue, a periodic stats poller, and the
//! shutdown discipline. The controller owns its own scheduler, so the
//! whole core runs and tests without any external switch runtime.
//!
//! ## Architecture
//!
//! ```text
//! switch events ──> mpsc queue ──> route() ──┬─> provisioner (connect)
//!                                            ├─> forwarder   (packet-in)
//!                                            └─> bandwidth engine ─> SLA ─> history/export
//! interval tick ──> stats poller ──> FlowStatsRequest per connected switch
//! ```

#![warn(missing_docs)]

pub mod controller;
pub mod event;
pub mod poller;

pub use controller::{ControllerConfig, SlicingController};
pub use event::Event;
pub use poller::StatsPoller;

use thiserror::Error;

/// Controller errors
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Core configuration error
    #[error(transparent)]
    Slice(#[from] slice_core::SliceError),

    /// Flow control error
    #[error(transparent)]
    Flow(#[from] slice_flow::FlowError),

    /// Telemetry error
    #[error(transparent)]
    Telemetry(#[from] slice_telemetry::TelemetryError),
}

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;
