//! Partition-lifecycle control plane.
//!
//! This crate is a thin umbrella: the actual implementation lives in
//! `crates/daq-protocol`, `crates/daq-state`, `crates/daq-control`, and the
//! `services/manager` / `services/peer` binaries. It exists so the workspace
//! root can hold the end-to-end scenario tests under `tests/integration/`.

pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
