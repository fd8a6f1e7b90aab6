//! Counter differentiation
//!
//! Converts successive cumulative flow counters into per-slice rate
//! estimates. Only the most recent sample per (slice, datapath) is
//! retained; older samples are retired immediately so the map never
//! grows beyond slices x datapaths.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use slice_core::SliceRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One flow entry from a statistics reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsEntry {
    /// UDP destination port of the rule's match, when present
    pub udp_dst: Option<u16>,
    /// Cumulative byte count
    pub byte_count: u64,
    /// Cumulative packet count
    pub packet_count: u64,
    /// Seconds the rule has existed
    pub duration_sec: u32,
    /// Rule priority
    pub priority: u16,
}

/// Per-slice rate estimate for one datapath and poll cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SliceThroughput {
    /// Slice name
    pub slice_name: String,
    /// Datapath the counters came from
    pub datapath_id: u64,
    /// Estimated rate since the previous poll (Mbps, never negative)
    pub bandwidth_mbps: f64,
    /// Cumulative bytes at this poll
    pub bytes: u64,
    /// Cumulative packets at this poll
    pub packets: u64,
}

#[derive(Debug, Clone, Copy)]
struct PrevSample {
    bytes: u64,
    at: Instant,
}

/// Differentiates cumulative counters into bandwidth estimates.
pub struct BandwidthEngine {
    registry: Arc<SliceRegistry>,
    /// Latest sample per (slice, datapath); sole writer is `ingest_at`
    prev: DashMap<(String, u64), PrevSample>,
}

impl BandwidthEngine {
    /// Engine over the given registry.
    pub fn new(registry: Arc<SliceRegistry>) -> Self {
        Self {
            registry,
            prev: DashMap::new(),
        }
    }

    /// Ingest a stats reply for one datapath.
    pub fn ingest(&self, dpid: u64, entries: &[FlowStatsEntry]) -> Vec<SliceThroughput> {
        self.ingest_at(dpid, entries, Instant::now())
    }

    /// Ingest with an explicit observation time.
    ///
    /// Every registered slice yields a throughput record each cycle,
    /// zero-valued when no rule counted traffic for it. The time delta
    /// is measured per (slice, datapath) from the previous successful
    /// poll, which absorbs scheduling jitter in the poll loop.
    pub fn ingest_at(
        &self,
        dpid: u64,
        entries: &[FlowStatsEntry],
        now: Instant,
    ) -> Vec<SliceThroughput> {
        // Aggregate cumulative counters per slice across matching rules
        let mut totals: HashMap<String, (u64, u64)> = HashMap::new();
        for entry in entries {
            let Some(port) = entry.udp_dst else { continue };
            let Some(slice) = self.registry.by_classification_key(port) else {
                continue;
            };
            let slot = totals.entry(slice.name.clone()).or_insert((0, 0));
            // switches can report absurd counters; never overflow here
            slot.0 = slot.0.saturating_add(entry.byte_count);
            slot.1 = slot.1.saturating_add(entry.packet_count);
        }

        let mut out = Vec::with_capacity(self.registry.len());
        for slice in self.registry.all() {
            let (bytes, packets) = totals.get(slice.name.as_str()).copied().unwrap_or((0, 0));
            let bandwidth_mbps = self.rate_for(slice.name.clone(), dpid, bytes, now);
            out.push(SliceThroughput {
                slice_name: slice.name.clone(),
                datapath_id: dpid,
                bandwidth_mbps,
                bytes,
                packets,
            });
        }
        debug!(dpid, entries = entries.len(), "counters differentiated");
        out
    }

    /// Delta the cumulative count against the stored previous sample
    /// and replace it atomically under the entry lock.
    fn rate_for(&self, slice_name: String, dpid: u64, bytes: u64, now: Instant) -> f64 {
        match self.prev.entry((slice_name, dpid)) {
            Entry::Occupied(mut occupied) => {
                let prev = *occupied.get();
                occupied.insert(PrevSample { bytes, at: now });

                let elapsed = now.saturating_duration_since(prev.at).as_secs_f64();
                if elapsed <= 0.0 {
                    return 0.0;
                }
                // A decreasing counter means the switch or rule was
                // reinitialized; clamp instead of reporting a negative rate.
                let byte_delta = bytes.saturating_sub(prev.bytes);
                let mbps = (byte_delta as f64 * 8.0) / (elapsed * 1_000_000.0);
                round3(mbps)
            }
            Entry::Vacant(vacant) => {
                // Bootstrap: rate is unknowable from a single cumulative
                // sample, so report zero until two samples exist.
                vacant.insert(PrevSample { bytes, at: now });
                0.0
            }
        }
    }

    /// Forget previous samples for a datapath (e.g. after disconnect).
    pub fn forget_datapath(&self, dpid: u64) {
        self.prev.retain(|(_, d), _| *d != dpid);
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
