//! Switch events
//!
//! Everything the switch boundary can tell the controller, as one sum
//! type routed by a single dispatch function. Per switch, events are
//! processed in arrival order; there is no cross-switch ordering.

use bytes::Bytes;
use slice_telemetry::FlowStatsEntry;

/// An asynchronous switch event
#[derive(Debug, Clone)]
pub enum Event {
    /// A switch connected and awaits provisioning
    SwitchConnected {
        /// Datapath identifier
        dpid: u64,
    },
    /// A switch went away; its state is purged
    SwitchDisconnected {
        /// Datapath identifier
        dpid: u64,
    },
    /// A packet missed every installed rule
    PacketIn {
        /// Datapath identifier
        dpid: u64,
        /// Ingress port
        in_port: u32,
        /// Raw frame bytes
        frame: Bytes,
    },
    /// Reply to a flow statistics request
    FlowStatsReply {
        /// Datapath identifier
        dpid: u64,
        /// Active rules with their counters
        entries: Vec<FlowStatsEntry>,
    },
}

impl Event {
    /// Datapath the event concerns
    pub fn dpid(&self) -> u64 {
        match self {
            Event::SwitchConnected { dpid }
            | Event::SwitchDisconnected { dpid }
            | Event::PacketIn { dpid, .. }
            | Event::FlowStatsReply { dpid, .. } => *dpid,
        }
    }
}
