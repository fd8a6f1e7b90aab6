//! NetSlice Core - Shared types for the slicing control plane
//!
//! This crate provides the data model shared by every component:
//! - Slice definitions and SLA thresholds
//! - The slice registry (classification-key and name lookup)
//! - Metric samples and compliance status
//! - Configuration loading and error handling

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod slice;

pub use error::{SliceError, SliceResult};
pub use metrics::{MetricSample, SlaStatus};
pub use registry::SliceRegistry;
pub use slice::{SlaThresholds, SliceDefinition};
