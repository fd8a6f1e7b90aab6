//! Packet classification and forwarding
//!
//! Handles unmatched-packet events: learns the source location, decides
//! the output port, installs a fast-path rule for recognized slice
//! traffic, and always emits the original frame. Rule installation
//! failures never block the immediate forward.

use crate::arena::SwitchArena;
use crate::frame;
use crate::proto::frame_consts::ETHERTYPE_LLDP;
use crate::proto::{Action, CommandSink, FlowMatch, FlowRule, OutputPort, SwitchCommand};
use bytes::Bytes;
use slice_core::SliceRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

/// Idle timeout for reactively installed rules (seconds)
const REACTIVE_IDLE_TIMEOUT: u16 = 60;

/// Priority for plain learning-switch rules
const L2_RULE_PRIORITY: u16 = 1;

/// What the forwarder decided for one packet, mostly for tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardDecision {
    /// Chosen output
    pub out: OutputPort,
    /// Slice the packet classified into, if any
    pub slice: Option<String>,
}

/// Per-packet decision logic for unmatched packets.
pub struct PacketForwarder {
    registry: Arc<SliceRegistry>,
    arena: Arc<SwitchArena>,
}

impl PacketForwarder {
    /// Forwarder over the given registry and switch arena.
    pub fn new(registry: Arc<SliceRegistry>, arena: Arc<SwitchArena>) -> Self {
        Self { registry, arena }
    }

    /// Handle one unmatched-packet event.
    ///
    /// Returns `None` when the frame was dropped (malformed or LLDP);
    /// otherwise the decision that was acted on.
    pub async fn handle_packet_in(
        &self,
        dpid: u64,
        in_port: u32,
        raw: &[u8],
        sink: &dyn CommandSink,
    ) -> Option<ForwardDecision> {
        let parsed = match frame::parse(raw) {
            Some(p) => p,
            None => {
                debug!(dpid, in_port, len = raw.len(), "dropping malformed frame");
                return None;
            }
        };

        // Discovery frames are not user traffic
        if parsed.eth_type == ETHERTYPE_LLDP {
            return None;
        }

        self.arena.learn(dpid, parsed.src, in_port);

        let out = match self.arena.lookup_port(dpid, parsed.dst) {
            Some(port) => OutputPort::Port(port),
            None => OutputPort::Flood,
        };

        let slice = parsed
            .udp_dst
            .and_then(|port| self.registry.by_classification_key(port));

        let mut actions = Vec::with_capacity(2);
        if let (OutputPort::Port(_), Some(slice)) = (out, &slice) {
            // Fast path: re-mark and forward without another round trip
            actions.push(Action::SetDscp(slice.qos_marking));
            actions.push(Action::Output(out));

            let rule = FlowRule {
                table_id: 0,
                priority: slice.priority,
                matcher: FlowMatch::fast_path(in_port, parsed.dst, slice.classification_key),
                actions: actions.clone(),
                meter_id: None,
                goto_table: None,
                idle_timeout: REACTIVE_IDLE_TIMEOUT,
            };
            self.install(dpid, rule, sink).await;
            debug!(
                dpid,
                src = %parsed.src,
                dst = %parsed.dst,
                slice = %slice.name,
                "slice fast path installed"
            );
        } else if let OutputPort::Port(_) = out {
            actions.push(Action::Output(out));

            let rule = FlowRule {
                table_id: 0,
                priority: L2_RULE_PRIORITY,
                matcher: FlowMatch::l2_path(in_port, parsed.dst),
                actions: actions.clone(),
                meter_id: None,
                goto_table: None,
                idle_timeout: REACTIVE_IDLE_TIMEOUT,
            };
            self.install(dpid, rule, sink).await;
        } else {
            actions.push(Action::Output(out));
        }

        // The installed rule only affects subsequent packets; the
        // triggering frame always goes out now.
        let packet_out = SwitchCommand::PacketOut {
            dpid,
            in_port,
            actions,
            frame: Bytes::copy_from_slice(raw),
        };
        if let Err(e) = sink.send(packet_out).await {
            warn!(dpid, error = %e, "packet-out failed");
        }

        Some(ForwardDecision {
            out,
            slice: slice.map(|s| s.name.clone()),
        })
    }

    /// Reactive rules carry an idle timeout and age out on the switch,
    /// so every table miss re-pushes them instead of consulting the
    /// installed set; the switch overwrites an identical rule in place.
    async fn install(&self, dpid: u64, rule: FlowRule, sink: &dyn CommandSink) {
        if let Err(e) = sink.send(SwitchCommand::InstallFlow { dpid, rule }).await {
            warn!(dpid, error = %e, "reactive rule install failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{MacAddr, RecordingSink};

    const H1: MacAddr = MacAddr([2, 0, 0, 0, 0, 1]);
    const H2: MacAddr = MacAddr([2, 0, 0, 0, 0, 2]);

    fn forwarder() -> (PacketForwarder, Arc<SwitchArena>) {
        let arena = Arc::new(SwitchArena::new());
        let registry = Arc::new(SliceRegistry::with_default_slices());
        let fwd = PacketForwarder::new(registry, arena.clone());
        arena.connect(1);
        (fwd, arena)
    }

    #[tokio::test]
    async fn test_unknown_destination_floods() {
        let (fwd, arena) = forwarder();
        let sink = RecordingSink::new();

        let raw = frame::encode_udp_frame(H1, H2, 9999);
        let decision = fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();

        assert_eq!(decision.out, OutputPort::Flood);
        assert_eq!(decision.slice, None);
        // source was learned regardless
        assert_eq!(arena.lookup_port(1, H1), Some(3));
        // flood installs no rule, but the frame still goes out
        assert_eq!(
            sink.count_where(|c| matches!(c, SwitchCommand::InstallFlow { .. })),
            0
        );
        assert_eq!(
            sink.count_where(|c| matches!(c, SwitchCommand::PacketOut { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_slice_traffic_gets_fast_path() {
        let (fwd, arena) = forwarder();
        let sink = RecordingSink::new();
        arena.learn(1, H2, 7);

        let raw = frame::encode_udp_frame(H1, H2, 5001);
        let decision = fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();

        assert_eq!(decision.out, OutputPort::Port(7));
        assert_eq!(decision.slice.as_deref(), Some("URLLC"));

        let rule = sink
            .commands()
            .into_iter()
            .find_map(|c| match c {
                SwitchCommand::InstallFlow { rule, .. } => Some(rule),
                _ => None,
            })
            .unwrap();
        assert_eq!(rule.priority, 100);
        assert_eq!(rule.idle_timeout, 60);
        assert_eq!(rule.matcher.udp_dst, Some(5001));
        assert_eq!(rule.matcher.in_port, Some(3));
        assert!(rule.actions.contains(&Action::SetDscp(46)));
    }

    #[tokio::test]
    async fn test_fast_path_repushed_after_rule_expiry() {
        let (fwd, arena) = forwarder();
        let sink = RecordingSink::new();
        arena.learn(1, H2, 7);

        let raw = frame::encode_udp_frame(H1, H2, 5001);
        fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();
        // the idle timeout removed the rule on the switch; the next
        // table miss must install it again, not punt forever
        fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();

        assert_eq!(
            sink.count_where(|c| matches!(c, SwitchCommand::InstallFlow { .. })),
            2
        );
    }

    #[tokio::test]
    async fn test_non_slice_traffic_gets_l2_rule() {
        let (fwd, arena) = forwarder();
        let sink = RecordingSink::new();
        arena.learn(1, H2, 7);

        let raw = frame::encode_udp_frame(H1, H2, 9999);
        fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();

        let rule = sink
            .commands()
            .into_iter()
            .find_map(|c| match c {
                SwitchCommand::InstallFlow { rule, .. } => Some(rule),
                _ => None,
            })
            .unwrap();
        assert_eq!(rule.priority, L2_RULE_PRIORITY);
        assert_eq!(rule.matcher.udp_dst, None);
        assert_eq!(rule.actions, vec![Action::Output(OutputPort::Port(7))]);
    }

    #[tokio::test]
    async fn test_lldp_dropped_silently() {
        let (fwd, arena) = forwarder();
        let sink = RecordingSink::new();

        let raw = frame::encode_raw_frame(H1, H2, ETHERTYPE_LLDP);
        assert!(fwd.handle_packet_in(1, 3, &raw, &sink).await.is_none());
        assert!(sink.commands().is_empty());
        // not even learned
        assert_eq!(arena.lookup_port(1, H1), None);
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped_without_effect() {
        let (fwd, _arena) = forwarder();
        let sink = RecordingSink::new();

        assert!(fwd.handle_packet_in(1, 3, &[0xde, 0xad], &sink).await.is_none());
        assert!(sink.commands().is_empty());
    }

    #[tokio::test]
    async fn test_install_failure_does_not_block_forward() {
        let (fwd, arena) = forwarder();
        arena.learn(1, H2, 7);

        // sink that fails flow installs but accepts packet-out
        struct FlakySink(RecordingSink);
        #[async_trait::async_trait]
        impl CommandSink for FlakySink {
            async fn send(&self, cmd: SwitchCommand) -> crate::Result<()> {
                if matches!(cmd, SwitchCommand::InstallFlow { .. }) {
                    return Err(crate::FlowError::SinkError("install rejected".into()));
                }
                self.0.send(cmd).await
            }
        }

        let sink = FlakySink(RecordingSink::new());
        let raw = frame::encode_udp_frame(H1, H2, 5001);
        let decision = fwd.handle_packet_in(1, 3, &raw, &sink).await.unwrap();

        assert_eq!(decision.out, OutputPort::Port(7));
        assert_eq!(
            sink.0.count_where(|c| matches!(c, SwitchCommand::PacketOut { .. })),
            1
        );
    }
}
