use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds between the Unix epoch and the epoch the original control plane
/// used for message-id timestamps (SPEC_FULL §6).
pub const POSIX_TIME_AT_EPICS_EPOCH: u64 = 631_152_000;

/// A monotonically increasing `SSSSSSSSSS-NNNNNNNNN` timestamp id.
///
/// `seconds` and `nanos` are kept separate (rather than collapsed into one
/// integer) so formatting matches the original's zero-padded two-field
/// layout exactly, including across second boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MsgId {
    seconds: u64,
    nanos: u32,
}

impl MsgId {
    pub fn new(seconds: u64, nanos: u32) -> Self {
        Self { seconds, nanos }
    }

    /// An id derived from the current wall clock, offset by
    /// [`POSIX_TIME_AT_EPICS_EPOCH`]. The nanosecond field is truncated to
    /// microsecond granularity (`microseconds * 1000`), matching the
    /// original's `timestampStr()` (spec.md §4.1).
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch");
        Self {
            seconds: since_epoch.as_secs().saturating_sub(POSIX_TIME_AT_EPICS_EPOCH),
            nanos: since_epoch.subsec_micros() * 1000,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (secs, nanos) = s.split_once('-')?;
        Some(Self {
            seconds: secs.parse().ok()?,
            nanos: nanos.parse().ok()?,
        })
    }
}

impl fmt::Display for MsgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}-{:09}", self.seconds, self.nanos)
    }
}

/// A per-process generator of strictly increasing [`MsgId`]s.
///
/// Ties on the wall clock (two calls within the same nanosecond) are broken
/// by a monotonic counter folded into the low bits of the nanosecond field,
/// guaranteeing strict ordering without ever going backwards relative to the
/// clock.
pub struct MsgIdGenerator {
    last_seconds: AtomicU64,
    last_nanos: AtomicU64,
}

impl Default for MsgIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MsgIdGenerator {
    pub fn new() -> Self {
        Self {
            last_seconds: AtomicU64::new(0),
            last_nanos: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> MsgId {
        let candidate = MsgId::now();
        let last_s = self.last_seconds.load(Ordering::Relaxed);
        let last_n = self.last_nanos.load(Ordering::Relaxed);
        let (seconds, nanos) = if candidate.seconds > last_s
            || (candidate.seconds == last_s && u64::from(candidate.nanos) > last_n)
        {
            (candidate.seconds, u64::from(candidate.nanos))
        } else {
            // Clock didn't advance since the last id; bump the nanosecond
            // field by one to preserve strict monotonicity.
            (last_s, last_n + 1)
        };
        self.last_seconds.store(seconds, Ordering::Relaxed);
        self.last_nanos.store(nanos, Ordering::Relaxed);
        MsgId::new(seconds, nanos as u32)
    }
}
