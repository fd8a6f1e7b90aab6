//! SLA evaluation against slice thresholds
//!
//! One evaluation compares a metric sample against all four SLA
//! dimensions of its slice. Every breached dimension yields exactly one
//! violation in the same cycle; the cycle is `Violated` iff its
//! violation set is non-empty.

use crate::violation::{Severity, SlaViolation, SeverityDistribution, ViolationSummary, ViolationType};
use crate::Result;
use chrono::Utc;
use parking_lot::Mutex;
use slice_core::{MetricSample, SlaStatus, SliceRegistry};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of evaluating one sample
#[derive(Debug, Clone)]
pub struct SlaCheck {
    /// Compliance verdict for the cycle
    pub status: SlaStatus,
    /// One violation per breached dimension
    pub violations: Vec<SlaViolation>,
}

/// Evaluates metric samples and maintains the violation ledger.
///
/// The ledger is append-mostly and guarded by a single lock; evaluation
/// cycles are infrequent relative to packet events, so contention is
/// not a concern here.
pub struct SlaEvaluator {
    registry: Arc<SliceRegistry>,
    ledger: Mutex<Vec<SlaViolation>>,
    counts: Mutex<BTreeMap<String, u64>>,
}

impl SlaEvaluator {
    /// Create an evaluator over the given registry.
    pub fn new(registry: Arc<SliceRegistry>) -> Self {
        let counts = registry
            .all()
            .iter()
            .map(|s| (s.name.clone(), 0u64))
            .collect();
        Self {
            registry,
            ledger: Mutex::new(Vec::new()),
            counts: Mutex::new(counts),
        }
    }

    /// Evaluate a sample against its slice's SLA.
    ///
    /// Unknown slice names produce `SlaStatus::Unknown` and record
    /// nothing; this is a reporting outcome, not an error.
    pub fn evaluate(&self, slice_name: &str, sample: &MetricSample) -> SlaCheck {
        let Some(slice) = self.registry.by_name(slice_name) else {
            warn!(slice = slice_name, "SLA check against unknown slice");
            return SlaCheck {
                status: SlaStatus::Unknown,
                violations: Vec::new(),
            };
        };

        let sla = &slice.sla;
        let now = Utc::now();
        let mut violations = Vec::new();

        // Bandwidth floor: equality is compliant
        if sample.bandwidth_mbps < sla.min_bandwidth_mbps {
            violations.push(SlaViolation {
                slice_name: slice_name.to_string(),
                violation_type: ViolationType::Bandwidth,
                expected_value: sla.min_bandwidth_mbps,
                actual_value: sample.bandwidth_mbps,
                severity: Severity::for_min_bound(sla.min_bandwidth_mbps, sample.bandwidth_mbps),
                timestamp: now,
            });
        }

        // Ceilings: equality is compliant
        if sample.latency_ms > sla.max_latency_ms {
            violations.push(SlaViolation {
                slice_name: slice_name.to_string(),
                violation_type: ViolationType::Latency,
                expected_value: sla.max_latency_ms,
                actual_value: sample.latency_ms,
                severity: Severity::for_max_bound(sla.max_latency_ms, sample.latency_ms),
                timestamp: now,
            });
        }
        if sample.jitter_ms > sla.max_jitter_ms {
            violations.push(SlaViolation {
                slice_name: slice_name.to_string(),
                violation_type: ViolationType::Jitter,
                expected_value: sla.max_jitter_ms,
                actual_value: sample.jitter_ms,
                severity: Severity::for_max_bound(sla.max_jitter_ms, sample.jitter_ms),
                timestamp: now,
            });
        }
        if sample.packet_loss_pct > sla.max_packet_loss_pct {
            violations.push(SlaViolation {
                slice_name: slice_name.to_string(),
                violation_type: ViolationType::PacketLoss,
                expected_value: sla.max_packet_loss_pct,
                actual_value: sample.packet_loss_pct,
                severity: Severity::for_max_bound(sla.max_packet_loss_pct, sample.packet_loss_pct),
                timestamp: now,
            });
        }

        if violations.is_empty() {
            debug!(slice = slice_name, "SLA compliant");
            return SlaCheck {
                status: SlaStatus::Compliant,
                violations,
            };
        }

        self.ledger.lock().extend(violations.iter().cloned());
        *self.counts.lock().entry(slice_name.to_string()).or_insert(0) +=
            violations.len() as u64;

        debug!(slice = slice_name, count = violations.len(), "SLA violated");
        SlaCheck {
            status: SlaStatus::Violated,
            violations,
        }
    }

    /// Violations recorded for one slice.
    pub fn violation_count(&self, slice_name: &str) -> u64 {
        self.counts.lock().get(slice_name).copied().unwrap_or(0)
    }

    /// Aggregate view over the whole ledger.
    pub fn violation_summary(&self) -> ViolationSummary {
        let ledger = self.ledger.lock();
        let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
        let mut severity = SeverityDistribution::default();

        for v in ledger.iter() {
            *by_type.entry(v.violation_type.to_string()).or_insert(0) += 1;
            match v.severity {
                Severity::Minor => severity.minor += 1,
                Severity::Major => severity.major += 1,
                Severity::Critical => severity.critical += 1,
            }
        }

        ViolationSummary {
            total_violations: ledger.len() as u64,
            violations_by_slice: self.counts.lock().clone(),
            violations_by_type: by_type,
            severity_distribution: severity,
        }
    }

    /// Reset the ledger and per-slice counters.
    ///
    /// Supports repeated evaluation runs without cross-run contamination.
    pub fn clear_violations(&self) {
        self.ledger.lock().clear();
        for count in self.counts.lock().values_mut() {
            *count = 0;
        }
        info!("SLA violations cleared");
    }

    /// Dump the summary plus the full ledger as JSON.
    pub fn export_violations(&self, path: &Path) -> Result<()> {
        let doc = serde_json::json!({
            "summary": self.violation_summary(),
            "violations": &*self.ledger.lock(),
        });
        std::fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        info!(path = %path.display(), "violations exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slice_core::MetricSample;

    fn evaluator() -> SlaEvaluator {
        SlaEvaluator::new(Arc::new(SliceRegistry::with_default_slices()))
    }

    fn sample(bw: f64, latency: f64, jitter: f64, loss: f64) -> MetricSample {
        MetricSample {
            slice_name: "URLLC".to_string(),
            timestamp: Utc::now(),
            bandwidth_mbps: bw,
            latency_ms: latency,
            jitter_ms: jitter,
            packet_loss_pct: loss,
            packets_sent: 1000,
            packets_received: 1000,
            bytes_transferred: 1_000_000,
            sla_status: SlaStatus::Unknown,
        }
    }

    #[test]
    fn test_compliant_sample_yields_no_violations() {
        // URLLC floor is 5 Mbps; 10 Mbps with quiet latency/jitter/loss passes
        let eval = evaluator();
        let check = eval.evaluate("URLLC", &sample(10.0, 2.0, 0.5, 0.0));
        assert_eq!(check.status, SlaStatus::Compliant);
        assert!(check.violations.is_empty());
        assert_eq!(eval.violation_summary().total_violations, 0);
    }

    #[test]
    fn test_three_breaches_yield_exactly_three_violations() {
        // bandwidth 2 < 5, latency 10 > 5, jitter 2 > 1, loss 0 <= 0.001
        let eval = evaluator();
        let check = eval.evaluate("URLLC", &sample(2.0, 10.0, 2.0, 0.0));

        assert_eq!(check.status, SlaStatus::Violated);
        assert_eq!(check.violations.len(), 3);
        let types: Vec<ViolationType> =
            check.violations.iter().map(|v| v.violation_type).collect();
        assert!(types.contains(&ViolationType::Bandwidth));
        assert!(types.contains(&ViolationType::Latency));
        assert!(types.contains(&ViolationType::Jitter));
        assert!(!types.contains(&ViolationType::PacketLoss));
    }

    #[test]
    fn test_min_bound_boundary_is_inclusive() {
        let eval = evaluator();
        // exactly at the floor: compliant
        let check = eval.evaluate("URLLC", &sample(5.0, 0.0, 0.0, 0.0));
        assert_eq!(check.status, SlaStatus::Compliant);

        // epsilon below: violated
        let check = eval.evaluate("URLLC", &sample(5.0 - 1e-9, 0.0, 0.0, 0.0));
        assert_eq!(check.status, SlaStatus::Violated);
        assert_eq!(check.violations[0].violation_type, ViolationType::Bandwidth);
    }

    #[test]
    fn test_max_bound_boundary_is_inclusive() {
        let eval = evaluator();
        let check = eval.evaluate("URLLC", &sample(10.0, 5.0, 1.0, 0.001));
        assert_eq!(check.status, SlaStatus::Compliant);
    }

    #[test]
    fn test_unknown_slice_is_not_an_error() {
        let eval = evaluator();
        let check = eval.evaluate("V2X", &sample(0.0, 999.0, 999.0, 99.0));
        assert_eq!(check.status, SlaStatus::Unknown);
        assert!(check.violations.is_empty());
        assert_eq!(eval.violation_summary().total_violations, 0);
    }

    #[test]
    fn test_clear_violations_resets_ledger_and_counts() {
        let eval = evaluator();
        eval.evaluate("URLLC", &sample(2.0, 10.0, 2.0, 0.0));
        assert_eq!(eval.violation_summary().total_violations, 3);
        assert_eq!(eval.violation_count("URLLC"), 3);

        eval.clear_violations();

        let summary = eval.violation_summary();
        assert_eq!(summary.total_violations, 0);
        assert!(summary.violations_by_slice.values().all(|&c| c == 0));
        assert!(summary.violations_by_type.is_empty());
        assert_eq!(summary.severity_distribution, SeverityDistribution::default());
    }

    #[test]
    fn test_summary_breaks_down_by_type_and_severity() {
        let eval = evaluator();
        // bandwidth 2/5 = 0.4 -> critical; latency 10/5 = 2.0 -> major;
        // jitter 2/1 = 2.0 -> major
        eval.evaluate("URLLC", &sample(2.0, 10.0, 2.0, 0.0));

        let summary = eval.violation_summary();
        assert_eq!(summary.violations_by_type["bandwidth"], 1);
        assert_eq!(summary.violations_by_type["latency"], 1);
        assert_eq!(summary.violations_by_type["jitter"], 1);
        assert_eq!(summary.severity_distribution.critical, 1);
        assert_eq!(summary.severity_distribution.major, 2);
        assert_eq!(summary.severity_distribution.minor, 0);
    }

    #[test]
    fn test_export_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("violations.json");

        let eval = evaluator();
        eval.evaluate("URLLC", &sample(2.0, 10.0, 2.0, 0.0));
        eval.export_violations(&path).unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["summary"]["total_violations"], 3);
        assert_eq!(doc["violations"].as_array().unwrap().len(), 3);
    }
}
