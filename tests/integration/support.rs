//! Shared helpers for the end-to-end scenario tests (spec.md §8). Not a
//! test itself — included via `#[path = "support.rs"] mod support;`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use daq_control::ControlClient;
use daq_protocol::{Envelope, Ports};
use daq_test_utils::MockPeer;

pub async fn spawn_manager(platform: u8) -> (manager::ManagerHandle, Ports) {
    let ports = Ports::for_platform(platform);
    let handle = manager::spawn("127.0.0.1", ports, false)
        .await
        .expect("manager should bind its ports");
    (handle, ports)
}

pub async fn connect_client(ports: Ports) -> ControlClient {
    ControlClient::connect("127.0.0.1", ports.front_rep, Duration::from_secs(2))
        .await
        .expect("control client should connect")
}

/// Subscribe to `front_pub` and collect every envelope into a shared
/// vector the caller can inspect after driving the scenario.
pub async fn watch_front_pub(ports: Ports) -> Arc<Mutex<Vec<Envelope>>> {
    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = collected.clone();
    let (_monitor, _join) = daq_control::StatusMonitor::spawn(
        "127.0.0.1",
        ports.front_pub,
        move |env| sink.lock().unwrap().push(env),
    )
    .await
    .expect("status monitor should connect");
    // Leak the monitor/join for the test's lifetime; the process exits at
    // the end of the test binary and tears everything down.
    std::mem::forget(_monitor);
    collected
}

pub fn spawn_drp_peer(ports: Ports, id: &str) {
    let _ = MockPeer::new("drp0", id).spawn("127.0.0.1", ports.back_pub, ports.back_pull);
}

pub fn spawn_peer(ports: Ports, level: &str, id: &str) {
    let _ = MockPeer::new(level, id).spawn("127.0.0.1", ports.back_pub, ports.back_pull);
}

pub fn spawn_failing_drp_peer(ports: Ports, id: &str, fail_transition: &str, node: &str, message: &str) {
    let mut err_info = std::collections::BTreeMap::new();
    err_info.insert(node.to_string(), message.to_string());
    let _ = MockPeer::new("drp0", id)
        .on(fail_transition, daq_test_utils::PeerBehavior::ErrInfo(err_info))
        .spawn("127.0.0.1", ports.back_pub, ports.back_pull);
}

pub fn spawn_unresponsive_peer(ports: Ports, level: &str, id: &str, silent_on: &str) {
    let _ = MockPeer::new(level, id)
        .on(silent_on, daq_test_utils::PeerBehavior::NoReply)
        .spawn("127.0.0.1", ports.back_pub, ports.back_pull);
}

/// Give background connections (mock peers, status monitors) a moment to
/// finish their WebSocket handshake before the scenario starts issuing
/// requests.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
