//! Slice definitions and SLA thresholds
//!
//! A slice is a named traffic class with its own classification key,
//! DSCP marking, rate limit, and SLA contract. Definitions are immutable
//! after load and shared read-only by every component.

use serde::{Deserialize, Serialize};

/// SLA thresholds for a network slice.
///
/// Bandwidth is a floor (minimum guaranteed); latency, jitter, and
/// packet loss are ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaThresholds {
    /// Minimum guaranteed bandwidth (Mbps)
    pub min_bandwidth_mbps: f64,
    /// Maximum allowed latency (ms)
    pub max_latency_ms: f64,
    /// Maximum allowed jitter (ms)
    pub max_jitter_ms: f64,
    /// Maximum allowed packet loss (%)
    pub max_packet_loss_pct: f64,
}

impl SlaThresholds {
    /// Ultra-reliable low-latency SLA
    pub fn urllc() -> Self {
        Self {
            min_bandwidth_mbps: 5.0,
            max_latency_ms: 5.0,
            max_jitter_ms: 1.0,
            max_packet_loss_pct: 0.001,
        }
    }

    /// Enhanced mobile broadband SLA
    pub fn embb() -> Self {
        Self {
            min_bandwidth_mbps: 50.0,
            max_latency_ms: 20.0,
            max_jitter_ms: 5.0,
            max_packet_loss_pct: 1.0,
        }
    }

    /// Massive machine-type communication SLA
    pub fn mmtc() -> Self {
        Self {
            min_bandwidth_mbps: 1.0,
            max_latency_ms: 100.0,
            max_jitter_ms: 20.0,
            max_packet_loss_pct: 1.0,
        }
    }
}

/// Complete configuration for a network slice.
///
/// `priority` doubles as the forwarding-rule priority on switches and
/// the ordering tie-break for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceDefinition {
    /// Slice name (unique key)
    pub name: String,
    /// UDP destination port used for traffic classification
    pub classification_key: u16,
    /// DSCP value written into matched packets
    pub qos_marking: u8,
    /// Switch meter bound to this slice's classification rule
    pub meter_id: u32,
    /// Rate limit enforced by the meter (kbps)
    pub rate_limit_kbps: u32,
    /// Slice priority (higher = more important)
    pub priority: u16,
    /// SLA contract
    pub sla: SlaThresholds,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl SliceDefinition {
    /// URLLC: ultra-reliable low-latency communication, DSCP 46 (EF)
    pub fn urllc() -> Self {
        Self {
            name: "URLLC".to_string(),
            classification_key: 5001,
            qos_marking: 46,
            meter_id: 1,
            rate_limit_kbps: 10_000,
            priority: 100,
            sla: SlaThresholds::urllc(),
            description: "Ultra-Reliable Low-Latency Communication for critical applications"
                .to_string(),
        }
    }

    /// eMBB: enhanced mobile broadband, DSCP 34 (AF41)
    pub fn embb() -> Self {
        Self {
            name: "eMBB".to_string(),
            classification_key: 5002,
            qos_marking: 34,
            meter_id: 2,
            rate_limit_kbps: 100_000,
            priority: 50,
            sla: SlaThresholds::embb(),
            description: "Enhanced Mobile Broadband for high-throughput applications".to_string(),
        }
    }

    /// mMTC: massive machine-type communication, DSCP 10 (AF11)
    pub fn mmtc() -> Self {
        Self {
            name: "mMTC".to_string(),
            classification_key: 5003,
            qos_marking: 10,
            meter_id: 3,
            rate_limit_kbps: 5_000,
            priority: 10,
            sla: SlaThresholds::mmtc(),
            description: "Massive Machine Type Communication for IoT devices".to_string(),
        }
    }

    /// The three default 5G slices
    pub fn default_slices() -> Vec<Self> {
        vec![Self::urllc(), Self::embb(), Self::mmtc()]
    }

    /// Meter burst size: one tenth of the rate limit.
    ///
    /// Bounds burst-induced false drops while keeping the steady-state
    /// ceiling enforced.
    pub fn burst_size_kbps(&self) -> u32 {
        self.rate_limit_kbps / 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_slices() {
        let slices = SliceDefinition::default_slices();
        assert_eq!(slices.len(), 3);

        let urllc = &slices[0];
        assert_eq!(urllc.classification_key, 5001);
        assert_eq!(urllc.qos_marking, 46);
        assert_eq!(urllc.priority, 100);
        assert_eq!(urllc.sla.min_bandwidth_mbps, 5.0);
        assert_eq!(urllc.sla.max_packet_loss_pct, 0.001);
    }

    #[test]
    fn test_burst_size() {
        assert_eq!(SliceDefinition::urllc().burst_size_kbps(), 1_000);
        assert_eq!(SliceDefinition::embb().burst_size_kbps(), 10_000);
    }

    #[test]
    fn test_roundtrip_json() {
        let slice = SliceDefinition::embb();
        let raw = serde_json::to_string(&slice).unwrap();
        let parsed: SliceDefinition = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, slice);
    }
}
