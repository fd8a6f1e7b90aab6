//! Switch state store
//!
//! One [`SwitchRecord`] per datapath, held in a concurrent arena so
//! events for different switches never block each other while updates
//! to the same switch stay serialized per entry.

use crate::proto::{MacAddr, RuleKey};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Mutable per-datapath state
#[derive(Debug, Default)]
pub struct SwitchRecord {
    /// Connection status
    pub connected: bool,
    /// Learned source address -> ingress port (last-seen wins)
    pub address_table: HashMap<MacAddr, u32>,
    /// Installed rule identities, for duplicate suppression
    pub installed_rules: HashSet<RuleKey>,
    /// Installed meter ids
    pub installed_meters: HashSet<u32>,
}

/// Arena of switch records indexed by datapath id.
#[derive(Default)]
pub struct SwitchArena {
    switches: DashMap<u64, SwitchRecord>,
}

impl SwitchArena {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a datapath as connected.
    ///
    /// Reconnecting an already-known datapath keeps its state so rule
    /// installation stays idempotent across repeated connect events.
    pub fn connect(&self, dpid: u64) {
        let mut entry = self.switches.entry(dpid).or_default();
        if !entry.connected {
            info!(dpid, "switch connected");
        }
        entry.connected = true;
    }

    /// Drop all state for a datapath.
    ///
    /// The switch loses its tables on disconnect, so the next connect
    /// starts from a clean record and reinstalls everything.
    pub fn disconnect(&self, dpid: u64) {
        if self.switches.remove(&dpid).is_some() {
            info!(dpid, "switch disconnected, state purged");
        }
    }

    /// True when the datapath is currently connected.
    pub fn is_connected(&self, dpid: u64) -> bool {
        self.switches.get(&dpid).map(|r| r.connected).unwrap_or(false)
    }

    /// All currently connected datapath ids.
    pub fn connected_datapaths(&self) -> Vec<u64> {
        self.switches
            .iter()
            .filter(|e| e.value().connected)
            .map(|e| *e.key())
            .collect()
    }

    /// Learn `src -> in_port`, overwriting any previous binding.
    pub fn learn(&self, dpid: u64, src: MacAddr, in_port: u32) {
        let mut entry = self.switches.entry(dpid).or_default();
        let previous = entry.address_table.insert(src, in_port);
        if previous != Some(in_port) {
            debug!(dpid, %src, in_port, "learned address");
        }
    }

    /// Port a destination address was last seen on, if known.
    pub fn lookup_port(&self, dpid: u64, dst: MacAddr) -> Option<u32> {
        self.switches
            .get(&dpid)?
            .address_table
            .get(&dst)
            .copied()
    }

    /// True when the rule identity is already recorded as installed.
    pub fn rule_installed(&self, dpid: u64, key: RuleKey) -> bool {
        self.switches
            .get(&dpid)
            .map(|r| r.installed_rules.contains(&key))
            .unwrap_or(false)
    }

    /// True when the meter is already recorded as installed.
    pub fn meter_installed(&self, dpid: u64, meter_id: u32) -> bool {
        self.switches
            .get(&dpid)
            .map(|r| r.installed_meters.contains(&meter_id))
            .unwrap_or(false)
    }

    /// Record a rule as installed.
    ///
    /// Returns `false` when the rule was already present, in which case
    /// the caller must not push it again.
    pub fn mark_rule_installed(&self, dpid: u64, key: RuleKey) -> bool {
        self.switches
            .entry(dpid)
            .or_default()
            .installed_rules
            .insert(key)
    }

    /// Record a meter as installed; `false` when already present.
    pub fn mark_meter_installed(&self, dpid: u64, meter_id: u32) -> bool {
        self.switches
            .entry(dpid)
            .or_default()
            .installed_meters
            .insert(meter_id)
    }

    /// Number of known datapaths (connected or not).
    pub fn len(&self) -> usize {
        self.switches.len()
    }

    /// True when no datapaths are known.
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}
