use crate::state::{State, Transition};

/// The precomputed pair-to-next-transition lookup (spec.md §4.3), a Rust
/// rendition of the original's `next_dict`. States form a strict linear
/// order (`Reset < Unallocated < Allocated < Connected < Paused <
/// Running`). The direct `Reset` edge only exists from `Unallocated`
/// (`collection.py`'s `next_dict` has `unallocated -> reset = reset`);
/// every other state walks down one edge at a time (`running -> reset` is
/// `disable`, `paused -> reset` is `unconfigure`, `connected -> reset` is
/// `disconnect`, `allocated -> reset` is `dealloc`), so the full pairwise
/// table collapses to: step one edge toward `to` along the chain, taking
/// the direct `Reset` shortcut only from `Unallocated`.
///
/// Returns `None` when `from == to` (nothing to do) — callers treat that as
/// "target reached", matching spec §4.3's walk-until-`state == target`
/// loop condition.
pub fn route(from: State, to: State) -> Option<Transition> {
    if from == to {
        return None;
    }
    if to == State::Reset {
        return Some(if from == State::Unallocated { Transition::Reset } else { down_edge(from) });
    }
    if to.rank() > from.rank() {
        Some(up_edge(from))
    } else {
        Some(down_edge(from))
    }
}

fn up_edge(from: State) -> Transition {
    match from {
        State::Reset => Transition::Plat,
        State::Unallocated => Transition::Alloc,
        State::Allocated => Transition::Connect,
        State::Connected => Transition::Configure,
        State::Paused => Transition::Enable,
        State::Running => unreachable!("running has no state ranked above it"),
    }
}

fn down_edge(from: State) -> Transition {
    match from {
        State::Running => Transition::Disable,
        State::Paused => Transition::Unconfigure,
        State::Connected => Transition::Disconnect,
        State::Allocated => Transition::Dealloc,
        State::Unallocated | State::Reset => {
            unreachable!("reset/unallocated have no state ranked below them other than via Reset")
        }
    }
}
