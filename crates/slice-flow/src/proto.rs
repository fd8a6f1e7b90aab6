//! Switch protocol boundary
//!
//! Typed commands the control plane pushes toward switches: flow rules,
//! meters, packet-out, and stats requests. The wire encoding lives with
//! the transport; this module only fixes the semantics the core needs.

use crate::{FlowError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Ethernet MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast address ff:ff:ff:ff:ff:ff
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// True for the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Where a packet or rule sends traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPort {
    /// A physical switch port
    Port(u32),
    /// Punt to the controller
    Controller,
    /// Broadcast to all ports except ingress
    Flood,
}

/// Action applied to matched traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Emit on the given output
    Output(OutputPort),
    /// Write a DSCP value into the IP header
    SetDscp(u8),
}

/// Match criteria for a flow rule.
///
/// Unset fields are wildcards. Hashable so it can key the
/// installed-rule set for idempotency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    /// Ingress port
    pub in_port: Option<u32>,
    /// Destination MAC
    pub eth_dst: Option<MacAddr>,
    /// Ethertype (0x0800 for IPv4)
    pub eth_type: Option<u16>,
    /// IP protocol (17 for UDP)
    pub ip_proto: Option<u8>,
    /// UDP destination port
    pub udp_dst: Option<u16>,
}

impl FlowMatch {
    /// Match everything (the table-miss rule)
    pub fn any() -> Self {
        Self::default()
    }

    /// Match a slice's classification key: IPv4/UDP to `key`
    pub fn slice_classifier(key: u16) -> Self {
        Self {
            eth_type: Some(frame_consts::ETHERTYPE_IPV4),
            ip_proto: Some(frame_consts::IP_PROTO_UDP),
            udp_dst: Some(key),
            ..Self::default()
        }
    }

    /// Match a learned L2 path: (ingress port, destination MAC)
    pub fn l2_path(in_port: u32, eth_dst: MacAddr) -> Self {
        Self {
            in_port: Some(in_port),
            eth_dst: Some(eth_dst),
            ..Self::default()
        }
    }

    /// Match the slice fast path: L2 path narrowed by classification key
    pub fn fast_path(in_port: u32, eth_dst: MacAddr, key: u16) -> Self {
        Self {
            in_port: Some(in_port),
            eth_dst: Some(eth_dst),
            eth_type: Some(frame_consts::ETHERTYPE_IPV4),
            ip_proto: Some(frame_consts::IP_PROTO_UDP),
            udp_dst: Some(key),
        }
    }
}

/// Ethertype and protocol constants shared with the frame parser
pub mod frame_consts {
    /// IPv4
    pub const ETHERTYPE_IPV4: u16 = 0x0800;
    /// LLDP discovery frames, dropped without processing
    pub const ETHERTYPE_LLDP: u16 = 0x88cc;
    /// UDP
    pub const IP_PROTO_UDP: u8 = 17;
}

/// Identity of an installed rule, for duplicate suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleKey {
    /// Flow table the rule lives in
    pub table_id: u8,
    /// Match criteria
    pub matcher: FlowMatch,
}

/// A complete flow rule push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRule {
    /// Flow table
    pub table_id: u8,
    /// Rule priority (higher wins)
    pub priority: u16,
    /// Match criteria
    pub matcher: FlowMatch,
    /// Apply-actions list
    pub actions: Vec<Action>,
    /// Meter binding, if any
    pub meter_id: Option<u32>,
    /// Continue processing in another table
    pub goto_table: Option<u8>,
    /// Remove after this many seconds idle (0 = permanent)
    pub idle_timeout: u16,
}

impl FlowRule {
    /// The catch-all rule that punts unmatched packets to the controller.
    pub fn table_miss() -> Self {
        Self {
            table_id: 0,
            priority: 0,
            matcher: FlowMatch::any(),
            actions: vec![Action::Output(OutputPort::Controller)],
            meter_id: None,
            goto_table: None,
            idle_timeout: 0,
        }
    }

    /// Identity key for the installed-rule set
    pub fn key(&self) -> RuleKey {
        RuleKey {
            table_id: self.table_id,
            matcher: self.matcher,
        }
    }
}

/// A rate-limiting meter with a single drop band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeterSpec {
    /// Meter identifier
    pub meter_id: u32,
    /// Drop-band rate (kbps)
    pub rate_kbps: u32,
    /// Drop-band burst size (kbps)
    pub burst_kbps: u32,
}

/// Command pushed toward a switch
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchCommand {
    /// Install a flow rule
    InstallFlow {
        /// Target datapath
        dpid: u64,
        /// Rule to install
        rule: FlowRule,
    },
    /// Install a meter
    InstallMeter {
        /// Target datapath
        dpid: u64,
        /// Meter to install
        meter: MeterSpec,
    },
    /// Emit a buffered frame with the given actions
    PacketOut {
        /// Target datapath
        dpid: u64,
        /// Ingress port of the original frame
        in_port: u32,
        /// Action list to apply
        actions: Vec<Action>,
        /// Raw frame bytes
        frame: Bytes,
    },
    /// Request flow statistics
    FlowStatsRequest {
        /// Target datapath
        dpid: u64,
    },
}

impl SwitchCommand {
    /// Datapath the command addresses
    pub fn dpid(&self) -> u64 {
        match self {
            SwitchCommand::InstallFlow { dpid, .. }
            | SwitchCommand::InstallMeter { dpid, .. }
            | SwitchCommand::PacketOut { dpid, .. }
            | SwitchCommand::FlowStatsRequest { dpid } => *dpid,
        }
    }
}

/// Transport abstraction for pushing commands toward switches.
///
/// The controller wires a real connection behind this; tests use
/// [`RecordingSink`]. Delivery failures are protocol errors: callers
/// log them and continue, they never propagate past the handler.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Deliver one command to its datapath.
    async fn send(&self, cmd: SwitchCommand) -> Result<()>;
}

/// In-memory sink that records every command, for tests and demos.
#[derive(Default)]
pub struct RecordingSink {
    commands: Mutex<Vec<SwitchCommand>>,
    fail: Mutex<bool>,
}

impl RecordingSink {
    /// Empty recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands sent so far
    pub fn commands(&self) -> Vec<SwitchCommand> {
        self.commands.lock().clone()
    }

    /// Commands of one kind, by predicate
    pub fn count_where(&self, pred: impl Fn(&SwitchCommand) -> bool) -> usize {
        self.commands.lock().iter().filter(|c| pred(c)).count()
    }

    /// Make subsequent sends fail, to exercise error paths
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn send(&self, cmd: SwitchCommand) -> Result<()> {
        if *self.fail.lock() {
            return Err(FlowError::SinkError("sink closed".to_string()));
        }
        self.commands.lock().push(cmd);
        Ok(())
    }
}
