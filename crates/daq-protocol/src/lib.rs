//! Wire types and transport constants for the partition control plane.
//!
//! Everything here is pure: no sockets, no clocks beyond `SystemTime`, no
//! async runtime. `services/manager` and `services/peer` build the actual
//! transport on top of these types.

mod envelope;
mod msgid;
mod ports;
mod transition_id;
mod wire;

pub use envelope::{Envelope, EnvelopeError, Header};
pub use msgid::{MsgId, MsgIdGenerator, POSIX_TIME_AT_EPICS_EPOCH};
pub use ports::Ports;
pub use transition_id::transition_id;
pub use wire::{PeerRecord, ProcInfo};
