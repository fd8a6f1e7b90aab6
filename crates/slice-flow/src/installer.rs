//! Switch provisioning on connect
//!
//! When a switch (re)connects, it receives the table-miss rule, one
//! rate-limiting meter per slice, and one classification rule per
//! slice. Installation is idempotent: identical rules are suppressed
//! via the switch's installed-rule set. Individual push failures are
//! logged, left unrecorded, and retried on the next connect rather
//! than mid-session.

use crate::arena::SwitchArena;
use crate::proto::{Action, CommandSink, FlowMatch, FlowRule, MeterSpec, SwitchCommand};
use crate::Result;
use slice_core::{SliceDefinition, SliceRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Table that holds destination-based forwarding rules; classification
/// rules in table 0 chain into it.
pub const FORWARDING_TABLE: u8 = 1;

/// Installs slice rules and meters on switch connect.
pub struct SliceProvisioner {
    registry: Arc<SliceRegistry>,
    arena: Arc<SwitchArena>,
}

impl SliceProvisioner {
    /// Provisioner over the given registry and switch arena.
    pub fn new(registry: Arc<SliceRegistry>, arena: Arc<SwitchArena>) -> Self {
        Self { registry, arena }
    }

    /// Handle a switch-connect event.
    ///
    /// Pushes the table-miss rule, then per slice a meter and a
    /// classification rule. Already-installed entries are skipped.
    pub async fn provision(&self, dpid: u64, sink: &dyn CommandSink) -> Result<()> {
        self.arena.connect(dpid);

        self.install_table_miss(dpid, sink).await;

        for slice in self.registry.all() {
            self.install_meter(dpid, slice, sink).await;
            self.install_classifier(dpid, slice, sink).await;
        }

        info!(dpid, slices = self.registry.len(), "switch provisioned");
        Ok(())
    }

    // Installed state is recorded only after a successful push, so a
    // failed push stays eligible for retry on the next connect.

    async fn install_table_miss(&self, dpid: u64, sink: &dyn CommandSink) {
        let rule = FlowRule::table_miss();
        let key = rule.key();
        if self.arena.rule_installed(dpid, key) {
            return;
        }
        match sink.send(SwitchCommand::InstallFlow { dpid, rule }).await {
            Ok(()) => {
                self.arena.mark_rule_installed(dpid, key);
            }
            Err(e) => warn!(dpid, error = %e, "table-miss install failed"),
        }
    }

    async fn install_meter(&self, dpid: u64, slice: &SliceDefinition, sink: &dyn CommandSink) {
        if self.arena.meter_installed(dpid, slice.meter_id) {
            return;
        }
        let meter = MeterSpec {
            meter_id: slice.meter_id,
            rate_kbps: slice.rate_limit_kbps,
            burst_kbps: slice.burst_size_kbps(),
        };
        match sink.send(SwitchCommand::InstallMeter { dpid, meter }).await {
            Ok(()) => {
                self.arena.mark_meter_installed(dpid, slice.meter_id);
                info!(
                    dpid,
                    slice = %slice.name,
                    meter_id = slice.meter_id,
                    rate_kbps = slice.rate_limit_kbps,
                    "meter installed"
                );
            }
            Err(e) => warn!(dpid, slice = %slice.name, error = %e, "meter install failed"),
        }
    }

    async fn install_classifier(&self, dpid: u64, slice: &SliceDefinition, sink: &dyn CommandSink) {
        let rule = FlowRule {
            table_id: 0,
            priority: slice.priority,
            matcher: FlowMatch::slice_classifier(slice.classification_key),
            actions: vec![Action::SetDscp(slice.qos_marking)],
            meter_id: Some(slice.meter_id),
            goto_table: Some(FORWARDING_TABLE),
            idle_timeout: 0,
        };
        let key = rule.key();
        if self.arena.rule_installed(dpid, key) {
            return;
        }
        match sink.send(SwitchCommand::InstallFlow { dpid, rule }).await {
            Ok(()) => {
                self.arena.mark_rule_installed(dpid, key);
                info!(
                    dpid,
                    slice = %slice.name,
                    key = slice.classification_key,
                    dscp = slice.qos_marking,
                    "classification rule installed"
                );
            }
            Err(e) => warn!(dpid, slice = %slice.name, error = %e, "classifier install failed"),
        }
    }
}
