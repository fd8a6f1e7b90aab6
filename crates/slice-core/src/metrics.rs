//! Metric samples and SLA compliance status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SLA compliance status for one evaluation cycle.
///
/// `Unknown` means the slice name did not resolve; it is distinct from
/// `Compliant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaStatus {
    /// All SLA dimensions within thresholds
    Compliant,
    /// At least one SLA dimension breached
    Violated,
    /// Slice name not found; nothing evaluated
    Unknown,
}

impl std::fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlaStatus::Compliant => write!(f, "compliant"),
            SlaStatus::Violated => write!(f, "violated"),
            SlaStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Aggregated measurement for one slice over one evaluation cycle.
///
/// Immutable once produced; appended to a bounded history and exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// Slice the sample belongs to
    pub slice_name: String,
    /// When the sample was produced (UTC)
    pub timestamp: DateTime<Utc>,
    /// Delivered bandwidth (Mbps, never negative)
    pub bandwidth_mbps: f64,
    /// Measured latency (ms)
    pub latency_ms: f64,
    /// Measured jitter (ms)
    pub jitter_ms: f64,
    /// Measured packet loss (%)
    pub packet_loss_pct: f64,
    /// Packets sent during the cycle
    pub packets_sent: u64,
    /// Packets received during the cycle
    pub packets_received: u64,
    /// Bytes transferred during the cycle
    pub bytes_transferred: u64,
    /// Compliance verdict for this cycle
    pub sla_status: SlaStatus,
}

impl MetricSample {
    /// Sample carrying only throughput data, as derived from switch
    /// counters. Latency, jitter, and loss default to zero until a
    /// measured source fills them in.
    pub fn from_throughput(slice_name: &str, bandwidth_mbps: f64, packets: u64, bytes: u64) -> Self {
        Self {
            slice_name: slice_name.to_string(),
            timestamp: Utc::now(),
            bandwidth_mbps,
            latency_ms: 0.0,
            jitter_ms: 0.0,
            packet_loss_pct: 0.0,
            packets_sent: packets,
            packets_received: packets,
            bytes_transferred: bytes,
            sla_status: SlaStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SlaStatus::Violated).unwrap(), "\"violated\"");
        assert_eq!(SlaStatus::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_timestamp_exports_utc_iso8601() {
        let sample = MetricSample::from_throughput("URLLC", 1.5, 10, 1000);
        let doc = serde_json::to_value(&sample).unwrap();
        let ts = doc["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z') || ts.contains("+00:00"));
    }
}
