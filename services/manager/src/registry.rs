use std::collections::{BTreeMap, BTreeSet};

use daq_protocol::PeerRecord;

/// `cmstate`: level -> peer id -> record (spec.md §3). A `BTreeMap` keeps
/// iteration order stable, which `alloc`'s dense `level_index` assignment
/// and the round-trip property in spec §8 depend on.
pub type CmState = BTreeMap<String, BTreeMap<String, PeerRecord>>;

/// The flat id set tracked alongside `cmstate`. Invariant (spec §8 #3): the
/// union of `cmstate`'s per-level id sets equals this set.
pub type Ids = BTreeSet<String>;

/// Find which level a known peer id belongs to, if any.
pub fn level_of(cmstate: &CmState, id: &str) -> Option<String> {
    cmstate
        .iter()
        .find(|(_, peers)| peers.contains_key(id))
        .map(|(level, _)| level.clone())
}

/// Assert-free invariant check used by tests: the union of per-level id
/// sets equals `ids`.
#[cfg(test)]
pub fn ids_match(cmstate: &CmState, ids: &Ids) -> bool {
    let union: Ids = cmstate.values().flat_map(|peers| peers.keys().cloned()).collect();
    &union == ids
}
