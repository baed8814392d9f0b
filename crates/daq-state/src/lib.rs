//! The partition-lifecycle state machine: states, transitions, guards, and
//! path routing toward a requested target state.
//!
//! This crate is pure: no sockets, no `tokio`. `services/manager` supplies
//! the actual `condition_*` guard logic and drives [`Engine`].

mod engine;
mod route;
mod state;

pub use engine::{Engine, TransitionError};
pub use route::route;
pub use state::{State, Transition};
