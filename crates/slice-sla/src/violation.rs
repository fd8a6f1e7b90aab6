//! Violation records and severity grading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SLA dimension that was breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// Bandwidth below the guaranteed floor
    Bandwidth,
    /// Latency above the ceiling
    Latency,
    /// Jitter above the ceiling
    Jitter,
    /// Packet loss above the ceiling
    PacketLoss,
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationType::Bandwidth => write!(f, "bandwidth"),
            ViolationType::Latency => write!(f, "latency"),
            ViolationType::Jitter => write!(f, "jitter"),
            ViolationType::PacketLoss => write!(f, "packet_loss"),
        }
    }
}

/// How far outside the SLA the measurement landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Just outside the threshold
    Minor,
    /// Substantially outside the threshold
    Major,
    /// Far outside the threshold, or a zero-tolerance SLA
    Critical,
}

impl Severity {
    /// Grade a minimum-bound breach (e.g. bandwidth) by `actual/expected`.
    ///
    /// A zero-valued threshold is treated as zero-tolerance: always
    /// critical, and no division takes place.
    pub fn for_min_bound(expected: f64, actual: f64) -> Self {
        if expected == 0.0 {
            return Severity::Critical;
        }
        let ratio = actual / expected;
        if ratio >= 0.8 {
            Severity::Minor
        } else if ratio >= 0.5 {
            Severity::Major
        } else {
            Severity::Critical
        }
    }

    /// Grade a maximum-bound breach (latency, jitter, loss) by
    /// `actual/expected`.
    pub fn for_max_bound(expected: f64, actual: f64) -> Self {
        if expected == 0.0 {
            return Severity::Critical;
        }
        let ratio = actual / expected;
        if ratio <= 1.2 {
            Severity::Minor
        } else if ratio <= 2.0 {
            Severity::Major
        } else {
            Severity::Critical
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Record of a single SLA breach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaViolation {
    /// Affected slice
    pub slice_name: String,
    /// Breached dimension
    pub violation_type: ViolationType,
    /// Threshold the SLA demands
    pub expected_value: f64,
    /// Measured value
    pub actual_value: f64,
    /// Graded severity
    pub severity: Severity,
    /// When the violation was detected
    pub timestamp: DateTime<Utc>,
}

/// Severity counts across the ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    /// Minor violations
    pub minor: u64,
    /// Major violations
    pub major: u64,
    /// Critical violations
    pub critical: u64,
}

/// Aggregate view over the violation ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationSummary {
    /// Total violations recorded
    pub total_violations: u64,
    /// Violations per slice
    pub violations_by_slice: BTreeMap<String, u64>,
    /// Violations per breached dimension
    pub violations_by_type: BTreeMap<String, u64>,
    /// Violations per severity grade
    pub severity_distribution: SeverityDistribution,
}
