//! The slicing controller
//!
//! Owns the shared state and routes every switch event through a
//! single dispatch. Failures in one switch's or one slice's handling
//! are logged and contained; they never halt processing for the rest.

use crate::event::Event;
use crate::poller::{StatsPoller, DEFAULT_POLL_INTERVAL};
use crate::Result;
use slice_core::{MetricSample, SliceRegistry};
use slice_flow::{CommandSink, PacketForwarder, SliceProvisioner, SwitchArena};
use slice_sla::{SlaCheck, SlaEvaluator};
use slice_telemetry::{
    ingest, BandwidthEngine, FlowMetricRecord, JitterDerivedLatency, LatencyEstimator,
    MetricExporter, MetricHistory, SliceSummary,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Controller tunables
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Stats poll interval
    pub poll_interval: Duration,
    /// Metric samples retained in history
    pub metric_retention: usize,
    /// Directory for NDJSON metric files
    pub metrics_dir: PathBuf,
    /// Optional HTTP ingestion endpoint for metric records
    pub export_endpoint: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            metric_retention: 1000,
            metrics_dir: PathBuf::from("monitoring/metrics"),
            export_endpoint: None,
        }
    }
}

/// Slice-aware SDN controller core.
pub struct SlicingController {
    registry: Arc<SliceRegistry>,
    arena: Arc<SwitchArena>,
    provisioner: SliceProvisioner,
    forwarder: PacketForwarder,
    engine: BandwidthEngine,
    evaluator: SlaEvaluator,
    history: MetricHistory,
    exporter: MetricExporter,
    sink: Arc<dyn CommandSink>,
    latency: Box<dyn LatencyEstimator>,
    poll_interval: Duration,
    /// Set on shutdown; no rules are installed once flipped
    halted: AtomicBool,
}

impl SlicingController {
    /// Build a controller over a registry and a command sink.
    pub fn new(
        registry: Arc<SliceRegistry>,
        sink: Arc<dyn CommandSink>,
        config: ControllerConfig,
    ) -> Result<Self> {
        let arena = Arc::new(SwitchArena::new());
        let mut exporter = MetricExporter::new(&config.metrics_dir)?;
        if let Some(endpoint) = &config.export_endpoint {
            exporter = exporter.with_endpoint(endpoint.clone());
        }

        info!(slices = registry.len(), "slicing controller initialized");
        Ok(Self {
            provisioner: SliceProvisioner::new(registry.clone(), arena.clone()),
            forwarder: PacketForwarder::new(registry.clone(), arena.clone()),
            engine: BandwidthEngine::new(registry.clone()),
            evaluator: SlaEvaluator::new(registry.clone()),
            history: MetricHistory::new(config.metric_retention),
            exporter,
            registry,
            arena,
            sink,
            latency: Box::new(JitterDerivedLatency),
            poll_interval: config.poll_interval,
            halted: AtomicBool::new(false),
        })
    }

    /// Replace the latency source for ingested transfer reports.
    pub fn with_latency_estimator(mut self, latency: Box<dyn LatencyEstimator>) -> Self {
        self.latency = latency;
        self
    }

    /// Route one switch event.
    ///
    /// Never returns an error: protocol failures are logged and scoped
    /// to the event that hit them.
    pub async fn route(&self, event: Event) {
        match event {
            Event::SwitchConnected { dpid } => {
                if self.halted.load(Ordering::SeqCst) {
                    debug!(dpid, "ignoring connect after shutdown");
                    return;
                }
                if let Err(e) = self.provisioner.provision(dpid, &*self.sink).await {
                    warn!(dpid, error = %e, "switch provisioning failed");
                }
            }
            Event::SwitchDisconnected { dpid } => {
                self.arena.disconnect(dpid);
                self.engine.forget_datapath(dpid);
            }
            Event::PacketIn { dpid, in_port, frame } => {
                // packet-in handling installs reactive rules, so it is
                // fenced off once shutdown has been signalled
                if self.halted.load(Ordering::SeqCst) {
                    debug!(dpid, in_port, "dropping packet-in after shutdown");
                    return;
                }
                self.forwarder
                    .handle_packet_in(dpid, in_port, &frame, &*self.sink)
                    .await;
            }
            Event::FlowStatsReply { dpid, entries } => {
                self.handle_stats_reply(dpid, &entries).await;
            }
        }
    }

    /// Differentiate counters, evaluate SLAs, and export the cycle.
    async fn handle_stats_reply(&self, dpid: u64, entries: &[slice_telemetry::FlowStatsEntry]) {
        let throughputs = self.engine.ingest(dpid, entries);

        let records: Vec<FlowMetricRecord> = throughputs.iter().map(FlowMetricRecord::from).collect();
        for t in &throughputs {
            let mut sample = MetricSample::from_throughput(
                &t.slice_name,
                t.bandwidth_mbps,
                t.packets,
                t.bytes,
            );
            let check = self.evaluator.evaluate(&t.slice_name, &sample);
            sample.sla_status = check.status;
            self.history.push(sample);

            debug!(
                dpid,
                slice = %t.slice_name,
                bandwidth_mbps = t.bandwidth_mbps,
                status = %check.status,
                "poll cycle evaluated"
            );
        }

        self.exporter.export_flow_records(&records).await;
    }

    /// Ingest a raw load-test report for one slice.
    ///
    /// Parses the report, fills in latency via the configured
    /// estimator, evaluates the SLA, and exports the resulting sample.
    pub async fn ingest_transfer_report(&self, slice_name: &str, raw: &str) -> Result<SlaCheck> {
        let report = ingest::parse_transfer_report(raw)?;
        let mut sample = ingest::sample_from_report(slice_name, &report, &*self.latency);

        let check = self.evaluator.evaluate(slice_name, &sample);
        sample.sla_status = check.status;

        self.history.push(sample.clone());
        self.exporter.export_samples(&[sample]).await;
        Ok(check)
    }

    /// Per-slice summary over the retained metric history.
    pub fn summary(&self) -> BTreeMap<String, SliceSummary> {
        self.history.summary()
    }

    /// The SLA evaluator (ledger, summaries, clearing).
    pub fn evaluator(&self) -> &SlaEvaluator {
        &self.evaluator
    }

    /// The metric history.
    pub fn history(&self) -> &MetricHistory {
        &self.history
    }

    /// The switch state arena.
    pub fn arena(&self) -> &Arc<SwitchArena> {
        &self.arena
    }

    /// The slice registry.
    pub fn registry(&self) -> &Arc<SliceRegistry> {
        &self.registry
    }

    /// Drain the event queue until shutdown, with the stats poller
    /// running alongside.
    ///
    /// On shutdown the poller stops, in-flight handling completes, and
    /// no further rules are installed.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<Event>,
        shutdown: watch::Receiver<bool>,
    ) {
        let poller = StatsPoller::new(self.arena.clone(), self.sink.clone(), self.poll_interval);
        let poller_task = tokio::spawn(poller.run(shutdown.clone()));

        let mut shutdown_rx = shutdown;
        loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.route(event).await,
                    None => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.halted.store(true, Ordering::SeqCst);
        let _ = poller_task.await;
        info!("controller stopped");
    }
}
