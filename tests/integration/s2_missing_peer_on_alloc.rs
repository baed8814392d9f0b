//! S2 — Missing peer on alloc (spec.md §8): one of two registered peers
//! never answers `alloc`; the guard fails, the state doesn't advance, and
//! exactly one generic error envelope is published.

#[path = "support.rs"]
mod support;

#[tokio::test]
async fn alloc_fails_and_reports_the_missing_peer() {
    let (_handle, ports) = support::spawn_manager(1).await;
    support::spawn_drp_peer(ports, "peer-a");
    support::spawn_unresponsive_peer(ports, "drp0", "peer-b", "alloc");
    support::settle().await;

    let statuses = support::watch_front_pub(ports).await;
    support::settle().await;

    let mut client = support::connect_client(ports).await;
    client.set_transition("plat").await.unwrap();
    client.set_transition("alloc").await.unwrap();

    // `get_state`'s reply only arrives once `alloc`'s guard (and its
    // 1-second deadline) has fully run, thanks to front_rep serialization.
    let state = client.get_state().await.unwrap();
    assert_eq!(state, "unallocated", "alloc must not advance the state on a missing peer");

    support::settle().await;
    let events = statuses.lock().unwrap();

    let status_events: Vec<_> = events.iter().filter(|e| e.header.key == "status").collect();
    assert_eq!(status_events.len(), 1, "only plat should have succeeded: {events:?}");
    assert_eq!(status_events[0].body["transition"], "plat");

    let error_events: Vec<_> = events.iter().filter(|e| e.header.key == "error").collect();
    assert_eq!(error_events.len(), 1, "expected exactly one generic error: {events:?}");
    assert_eq!(
        error_events[0].body["error"],
        "1 client did not respond to alloc"
    );
}
