//! S4 — Peer-reported `configure` error (spec.md §8): a `drp` peer answers
//! `configure` with a non-empty `err_info`; the guard fails, the state
//! doesn't advance past `connected`, and the error is published verbatim
//! as `"{node}: {message}"`.

#[path = "support.rs"]
mod support;

#[tokio::test]
async fn configure_fails_on_peer_reported_error() {
    let (_handle, ports) = support::spawn_manager(3).await;
    support::spawn_failing_drp_peer(ports, "peer-a", "configure", "node7", "FPGA link down");
    support::settle().await;

    let statuses = support::watch_front_pub(ports).await;
    support::settle().await;

    let mut client = support::connect_client(ports).await;
    client.set_transition("plat").await.unwrap();
    client.set_transition("alloc").await.unwrap();
    client.set_transition("connect").await.unwrap();
    client.set_transition("configure").await.unwrap();

    let state = client.get_state().await.unwrap();
    assert_eq!(state, "connected", "configure must not advance past connected on a peer error");

    support::settle().await;
    let events = statuses.lock().unwrap();

    let status_events: Vec<_> = events.iter().filter(|e| e.header.key == "status").collect();
    let transitions: Vec<_> = status_events
        .iter()
        .map(|e| e.body["transition"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(transitions, vec!["plat", "alloc", "connect"]);

    let error_events: Vec<_> = events.iter().filter(|e| e.header.key == "error").collect();
    assert_eq!(error_events.len(), 1, "expected exactly one peer-reported error: {events:?}");
    assert_eq!(error_events[0].body["error"], "node7: FPGA link down");
}
