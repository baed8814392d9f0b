use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A stable opaque id derived from `(host, pid)` (spec.md §3, SPEC_FULL §3
/// [ADD]). Stable for the process lifetime; two peers on different hosts
/// (or the same host with different pids) get different ids with
/// overwhelming probability.
pub fn peer_id(host: &str, pid: u32) -> String {
    let mut hasher = DefaultHasher::new();
    host.hash(&mut hasher);
    pid.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
