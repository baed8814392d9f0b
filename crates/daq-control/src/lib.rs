//! Operator-facing client for the partition control plane: the
//! request/reply Control Client and the subscriber-side Status Monitor.

mod control_client;
mod status_monitor;

pub use control_client::{ControlClient, ControlError};
pub use status_monitor::StatusMonitor;
