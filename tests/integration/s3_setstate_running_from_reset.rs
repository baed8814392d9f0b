//! S3 — `setstate.running` from `reset` (spec.md §8): a single `setstate`
//! request walks the manager through five transitions to reach `running`.

#[path = "support.rs"]
mod support;

const EXPECTED_TRANSITIONS: [&str; 5] = ["plat", "alloc", "connect", "configure", "enable"];

#[tokio::test]
async fn setstate_running_walks_five_transitions() {
    let (_handle, ports) = support::spawn_manager(2).await;
    support::spawn_drp_peer(ports, "peer-a");
    support::settle().await;

    let statuses = support::watch_front_pub(ports).await;
    support::settle().await;

    let mut client = support::connect_client(ports).await;
    client.set_state("running").await.unwrap();

    let state = client.get_state().await.unwrap();
    assert_eq!(state, "running");

    support::settle().await;
    let events = statuses.lock().unwrap();
    let status_events: Vec<_> = events.iter().filter(|e| e.header.key == "status").collect();
    let transitions: Vec<_> = status_events
        .iter()
        .map(|e| e.body["transition"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(transitions, EXPECTED_TRANSITIONS.to_vec());

    let error_events: Vec<_> = events.iter().filter(|e| e.header.key == "error").collect();
    assert!(error_events.is_empty(), "unexpected errors: {error_events:?}");
}
