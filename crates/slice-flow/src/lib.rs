//! NetSlice Flow Control
//!
//! Switch-facing half of the slicing control plane:
//!
//! - **Switch State Store**: per-datapath arena of learned addresses,
//!   installed rules, and meters
//! - **Provisioner**: installs table-miss, meter, and classification
//!   rules whenever a switch connects
//! - **Forwarder**: per-packet learning-switch decisions with slice
//!   fast-path rule installation
//!
//! All switch commands flow through the [`CommandSink`] trait so the
//! core stays testable without a live switch connection.

#![warn(missing_docs)]

pub mod arena;
pub mod forwarder;
pub mod frame;
pub mod installer;
pub mod proto;

pub use arena::{SwitchArena, SwitchRecord};
pub use forwarder::{ForwardDecision, PacketForwarder};
pub use frame::ParsedFrame;
pub use installer::SliceProvisioner;
pub use proto::{
    Action, CommandSink, FlowMatch, FlowRule, MacAddr, MeterSpec, OutputPort, RecordingSink,
    RuleKey, SwitchCommand,
};

use thiserror::Error;

/// Flow control errors
#[derive(Error, Debug)]
pub enum FlowError {
    /// Command could not be delivered to the switch
    #[error("command sink error: {0}")]
    SinkError(String),
}

/// Result type for flow control operations
pub type Result<T> = std::result::Result<T, FlowError>;
