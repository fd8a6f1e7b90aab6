//! Metric export
//!
//! Exports metric records two ways: newline-delimited JSON appended to
//! files for log-shipper ingestion, and a best-effort HTTP POST per
//! record. HTTP failures are logged at debug level and swallowed; the
//! ingestion endpoint being down must never affect the control plane.

use crate::counters::SliceThroughput;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use slice_core::MetricSample;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const FLOW_METRICS_FILE: &str = "flow_metrics.json";
const SLICE_METRICS_FILE: &str = "slice_metrics.json";
const HTTP_TIMEOUT: Duration = Duration::from_secs(2);

/// One exported flow-statistics record
#[derive(Debug, Clone, Serialize)]
pub struct FlowMetricRecord {
    /// Record time (ISO-8601 UTC)
    pub timestamp: DateTime<Utc>,
    /// Slice name
    pub slice_name: String,
    /// Estimated bandwidth (Mbps)
    pub bandwidth_mbps: f64,
    /// Cumulative packets
    pub packets: u64,
    /// Cumulative bytes
    pub bytes: u64,
    /// Producing component tag
    pub source: &'static str,
    /// Record type tag
    #[serde(rename = "type")]
    pub record_type: &'static str,
}

impl From<&SliceThroughput> for FlowMetricRecord {
    fn from(t: &SliceThroughput) -> Self {
        Self {
            timestamp: Utc::now(),
            slice_name: t.slice_name.clone(),
            bandwidth_mbps: t.bandwidth_mbps,
            packets: t.packets,
            bytes: t.bytes,
            source: "netslice",
            record_type: "flow_stats",
        }
    }
}

/// Writes metric records to NDJSON files and optionally POSTs them to
/// an HTTP ingestion endpoint.
pub struct MetricExporter {
    output_dir: PathBuf,
    endpoint: Option<String>,
    client: reqwest::Client,
}

impl MetricExporter {
    /// Exporter writing under `output_dir`, with no HTTP endpoint.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        info!(dir = %output_dir.display(), "metric exporter ready");
        Ok(Self {
            output_dir,
            endpoint: None,
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
        })
    }

    /// Also POST each record to `endpoint`, best effort.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Export flow-statistics records.
    pub async fn export_flow_records(&self, records: &[FlowMetricRecord]) {
        self.export(FLOW_METRICS_FILE, records).await;
    }

    /// Export full metric samples.
    pub async fn export_samples(&self, samples: &[MetricSample]) {
        self.export(SLICE_METRICS_FILE, samples).await;
    }

    async fn export<T: Serialize>(&self, filename: &str, records: &[T]) {
        if records.is_empty() {
            return;
        }
        if let Err(e) = self.append_ndjson(filename, records) {
            warn!(file = filename, error = %e, "metric file write failed");
        }
        for record in records {
            self.post(record).await;
        }
    }

    /// Append one JSON line per record.
    fn append_ndjson<T: Serialize>(&self, filename: &str, records: &[T]) -> Result<()> {
        let path = self.output_dir.join(filename);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        for record in records {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// POST one record; failures are expected when the collector is
    /// down and are deliberately swallowed.
    async fn post<T: Serialize>(&self, record: &T) {
        let Some(endpoint) = &self.endpoint else { return };
        match self.client.post(endpoint).json(record).send().await {
            Ok(resp) if !resp.status().is_success() => {
                debug!(status = %resp.status(), "metric endpoint rejected record");
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "metric endpoint unreachable"),
        }
    }

    /// Directory the NDJSON files land in.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throughput() -> SliceThroughput {
        SliceThroughput {
            slice_name: "URLLC".to_string(),
            datapath_id: 1,
            bandwidth_mbps: 1.25,
            bytes: 125_000,
            packets: 100,
        }
    }

    #[tokio::test]
    async fn test_ndjson_record_shape() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = MetricExporter::new(dir.path()).unwrap();

        let records = vec![FlowMetricRecord::from(&throughput())];
        exporter.export_flow_records(&records).await;

        let raw = std::fs::read_to_string(dir.path().join(FLOW_METRICS_FILE)).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 1);

        let doc: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(doc["slice_name"], "URLLC");
        assert_eq!(doc["bandwidth_mbps"], 1.25);
        assert_eq!(doc["packets"], 100);
        assert_eq!(doc["bytes"], 125_000);
        assert_eq!(doc["source"], "netslice");
        assert_eq!(doc["type"], "flow_stats");
        assert!(doc["timestamp"].as_str().unwrap().ends_with('Z')
            || doc["timestamp"].as_str().unwrap().contains("+00:00"));
    }

    #[tokio::test]
    async fn test_export_appends() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = MetricExporter::new(dir.path()).unwrap();

        let records = vec![FlowMetricRecord::from(&throughput())];
        exporter.export_flow_records(&records).await;
        exporter.export_flow_records(&records).await;

        let raw = std::fs::read_to_string(dir.path().join(FLOW_METRICS_FILE)).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = MetricExporter::new(dir.path())
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/ingest");

        // must not panic or error out
        exporter
            .export_flow_records(&[FlowMetricRecord::from(&throughput())])
            .await;
        assert!(dir.path().join(FLOW_METRICS_FILE).exists());
    }
}
