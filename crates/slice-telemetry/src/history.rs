//! Bounded metric history and per-slice summaries

use parking_lot::Mutex;
use serde::Serialize;
use slice_core::{MetricSample, SlaStatus};
use std::collections::{BTreeMap, VecDeque};

/// Per-slice aggregate over the retained history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceSummary {
    /// Samples retained for the slice
    pub samples: u64,
    /// Mean bandwidth (Mbps)
    pub avg_bandwidth_mbps: f64,
    /// Mean latency (ms)
    pub avg_latency_ms: f64,
    /// Mean jitter (ms)
    pub avg_jitter_ms: f64,
    /// Mean packet loss (%)
    pub avg_packet_loss_pct: f64,
    /// Samples whose cycle was violated
    pub violations: u64,
    /// `(samples - violations) / samples * 100`
    pub compliance_rate_pct: f64,
}

/// Append-only metric history with bounded retention.
///
/// Oldest samples are evicted beyond the retention count so the
/// history never grows unbounded.
pub struct MetricHistory {
    samples: Mutex<VecDeque<MetricSample>>,
    retention: usize,
}

impl MetricHistory {
    /// History retaining at most `retention` samples.
    pub fn new(retention: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(retention.min(1024))),
            retention,
        }
    }

    /// Append a sample, evicting the oldest beyond retention.
    ///
    /// A zero retention keeps nothing.
    pub fn push(&self, sample: MetricSample) {
        if self.retention == 0 {
            return;
        }
        let mut samples = self.samples.lock();
        while samples.len() >= self.retention {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Retained samples for one slice, oldest first.
    pub fn samples_for(&self, slice_name: &str) -> Vec<MetricSample> {
        self.samples
            .lock()
            .iter()
            .filter(|s| s.slice_name == slice_name)
            .cloned()
            .collect()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// True when no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Per-slice aggregates over the retained history.
    pub fn summary(&self) -> BTreeMap<String, SliceSummary> {
        let samples = self.samples.lock();
        let mut acc: BTreeMap<String, (u64, f64, f64, f64, f64, u64)> = BTreeMap::new();

        for s in samples.iter() {
            let slot = acc.entry(s.slice_name.clone()).or_default();
            slot.0 += 1;
            slot.1 += s.bandwidth_mbps;
            slot.2 += s.latency_ms;
            slot.3 += s.jitter_ms;
            slot.4 += s.packet_loss_pct;
            if s.sla_status == SlaStatus::Violated {
                slot.5 += 1;
            }
        }

        acc.into_iter()
            .map(|(name, (n, bw, lat, jit, loss, violated))| {
                let count = n as f64;
                (
                    name,
                    SliceSummary {
                        samples: n,
                        avg_bandwidth_mbps: round3(bw / count),
                        avg_latency_ms: round3(lat / count),
                        avg_jitter_ms: round3(jit / count),
                        avg_packet_loss_pct: round3(loss / count),
                        violations: violated,
                        compliance_rate_pct: round3((n - violated) as f64 / count * 100.0),
                    },
                )
            })
            .collect()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(slice: &str, bw: f64, status: SlaStatus) -> MetricSample {
        MetricSample {
            slice_name: slice.to_string(),
            timestamp: Utc::now(),
            bandwidth_mbps: bw,
            latency_ms: 2.0,
            jitter_ms: 0.5,
            packet_loss_pct: 0.0,
            packets_sent: 100,
            packets_received: 100,
            bytes_transferred: 10_000,
            sla_status: status,
        }
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let history = MetricHistory::new(3);
        for bw in [1.0, 2.0, 3.0, 4.0] {
            history.push(sample("URLLC", bw, SlaStatus::Compliant));
        }

        assert_eq!(history.len(), 3);
        let retained = history.samples_for("URLLC");
        assert_eq!(retained[0].bandwidth_mbps, 2.0);
        assert_eq!(retained[2].bandwidth_mbps, 4.0);
    }

    #[test]
    fn test_zero_retention_keeps_nothing() {
        let history = MetricHistory::new(0);
        history.push(sample("URLLC", 1.0, SlaStatus::Compliant));
        history.push(sample("URLLC", 2.0, SlaStatus::Compliant));

        assert!(history.is_empty());
        assert!(history.samples_for("URLLC").is_empty());
    }

    #[test]
    fn test_summary_averages_and_compliance_rate() {
        let history = MetricHistory::new(100);
        history.push(sample("URLLC", 10.0, SlaStatus::Compliant));
        history.push(sample("URLLC", 6.0, SlaStatus::Compliant));
        history.push(sample("URLLC", 2.0, SlaStatus::Violated));
        history.push(sample("URLLC", 2.0, SlaStatus::Violated));
        history.push(sample("eMBB", 60.0, SlaStatus::Compliant));

        let summary = history.summary();
        let urllc = &summary["URLLC"];
        assert_eq!(urllc.samples, 4);
        assert_eq!(urllc.avg_bandwidth_mbps, 5.0);
        assert_eq!(urllc.violations, 2);
        assert_eq!(urllc.compliance_rate_pct, 50.0);

        let embb = &summary["eMBB"];
        assert_eq!(embb.samples, 1);
        assert_eq!(embb.compliance_rate_pct, 100.0);
    }

    #[test]
    fn test_empty_history() {
        let history = MetricHistory::new(10);
        assert!(history.is_empty());
        assert!(history.summary().is_empty());
    }
}
