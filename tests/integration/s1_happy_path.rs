//! S1 — Happy path (spec.md §8): two `drp` peers walk the full lifecycle
//! and back down to `reset`, emitting ten status broadcasts in order.

#[path = "support.rs"]
mod support;

const SEQUENCE: [&str; 10] = [
    "plat",
    "alloc",
    "connect",
    "configure",
    "enable",
    "disable",
    "unconfigure",
    "disconnect",
    "dealloc",
    "reset",
];

#[tokio::test]
async fn happy_path_walks_the_full_lifecycle_and_back() {
    let (_handle, ports) = support::spawn_manager(0).await;
    support::spawn_drp_peer(ports, "peer-a");
    support::spawn_drp_peer(ports, "peer-b");
    support::settle().await;

    let statuses = support::watch_front_pub(ports).await;
    support::settle().await;

    let mut client = support::connect_client(ports).await;
    for transition in SEQUENCE {
        client
            .set_transition(transition)
            .await
            .unwrap_or_else(|e| panic!("{transition} request failed: {e}"));
    }

    let state = client.get_state().await.unwrap();
    assert_eq!(state, "reset");

    let cmstate = client.get_platform().await.unwrap();
    assert_eq!(cmstate, serde_json::json!({}));

    // `get_state`'s round trip guarantees `reset`'s guard already ran (the
    // front_rep queue is strictly serialized), but the broadcast still has
    // to reach the status monitor's own task over its own socket.
    support::settle().await;
    let events = statuses.lock().unwrap();
    let status_events: Vec<_> = events.iter().filter(|e| e.header.key == "status").collect();
    assert_eq!(status_events.len(), 10, "expected ten status broadcasts, got {events:?}");

    let transitions: Vec<_> = status_events
        .iter()
        .map(|e| e.body["transition"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(transitions, SEQUENCE.to_vec());

    let error_events: Vec<_> = events.iter().filter(|e| e.header.key == "error").collect();
    assert!(error_events.is_empty(), "unexpected errors: {error_events:?}");
}
