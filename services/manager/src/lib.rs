//! The Collection Manager: owns the partition's peer registry, runs the
//! state machine, fans transitions out, aggregates confirmations, and
//! publishes status.

pub mod coordinator;
pub mod registry;
pub mod transport;

pub use coordinator::Coordinator;

use daq_protocol::Ports;

/// A running manager instance. Dropping this does not stop the manager —
/// its listener tasks and coordinator run independently; hold `join` and
/// abort or await it to shut down.
pub struct ManagerHandle {
    pub join: tokio::task::JoinHandle<()>,
}

/// Bind all four ports for `ports` on `bind_host` and start the
/// coordinator. Used by both `main.rs` and the workspace's end-to-end
/// scenario tests.
pub async fn spawn(bind_host: &str, ports: Ports, autoconnect: bool) -> std::io::Result<ManagerHandle> {
    let back_pull_rx = transport::spawn_back_pull(bind_host, ports.back_pull).await?;
    let back_pub_tx = transport::spawn_fanout(bind_host, ports.back_pub).await?;
    let front_pub_tx = transport::spawn_fanout(bind_host, ports.front_pub).await?;
    let front_rep_rx = transport::spawn_front_rep(bind_host, ports.front_rep).await?;

    let coordinator = Coordinator::new(back_pub_tx, front_pub_tx, back_pull_rx);
    let join = tokio::spawn(coordinator.run(front_rep_rx, autoconnect));
    Ok(ManagerHandle { join })
}
