use crate::route::route;
use crate::state::{State, Transition};

/// Why a transition did not happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// `transition` has no edge starting at `from` (e.g. `connect` fired
    /// while not `allocated`).
    #[error("{transition} is not a legal transition from {from}")]
    NoSuchEdge { transition: Transition, from: State },

    /// The guard ran but returned failure; carries the guard's own message
    /// (spec.md §4.3: "the engine reports ... unless the guard explicitly
    /// set a more specific error").
    #[error("{0}")]
    GuardFailed(String),

    /// `setstate.<target>` named a string that is not one of the six legal
    /// states.
    #[error("unrecognized target state: {0}")]
    UnknownTarget(String),

    /// `route` found nothing to fire (should not happen given the total
    /// order over states, but kept as an explicit error rather than a
    /// panic so a future non-linear state set fails safely).
    #[error("no route from {from} to {to}")]
    NoRoute { from: State, to: State },
}

/// Drives the state machine. Holds only the current [`State`]; callers own
/// everything else (peer registry, sockets) and pass in a guard per call.
pub struct Engine {
    state: State,
    last_transition: Option<Transition>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: State::Reset,
            last_transition: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.last_transition
    }

    /// Fire a single named transition, running `guard` only if the edge is
    /// legal from the current state. On guard success, advances `state` and
    /// records `last_transition`.
    pub fn fire(
        &mut self,
        transition: Transition,
        guard: impl FnOnce() -> Result<(), String>,
    ) -> Result<State, TransitionError> {
        let target = transition
            .apply(self.state)
            .ok_or(TransitionError::NoSuchEdge {
                transition,
                from: self.state,
            })?;
        guard().map_err(TransitionError::GuardFailed)?;
        self.state = target;
        self.last_transition = Some(transition);
        Ok(self.state)
    }

    /// Walk toward `target`, consulting [`route`] at each step and firing
    /// `guard_for` for the transition chosen. Stops at the first guard
    /// failure (spec.md §4.3), returning the error alongside however far
    /// the walk got.
    pub fn walk_toward(
        &mut self,
        target: State,
        mut guard_for: impl FnMut(Transition) -> Result<(), String>,
    ) -> Result<Vec<Transition>, (Vec<Transition>, TransitionError)> {
        let mut fired = Vec::new();
        while self.state != target {
            let Some(transition) = route(self.state, target) else {
                return Err((fired, TransitionError::NoRoute { from: self.state, to: target }));
            };
            match self.fire(transition, || guard_for(transition)) {
                Ok(_) => fired.push(transition),
                Err(e) => return Err((fired, e)),
            }
        }
        Ok(fired)
    }
}
