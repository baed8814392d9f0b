//! S5 — `setstate.reset` from `running` (spec.md §8): the manager walks
//! `disable`, `unconfigure`, `disconnect`, `dealloc`, `reset`, landing back
//! at `reset` with an empty `cmstate`.

#[path = "support.rs"]
mod support;

const CLIMB: [&str; 5] = ["plat", "alloc", "connect", "configure", "enable"];
const DESCENT: [&str; 5] = ["disable", "unconfigure", "disconnect", "dealloc", "reset"];

#[tokio::test]
async fn setstate_reset_walks_back_down_from_running() {
    let (_handle, ports) = support::spawn_manager(4).await;
    support::spawn_drp_peer(ports, "peer-a");
    support::settle().await;

    let statuses = support::watch_front_pub(ports).await;
    support::settle().await;

    let mut client = support::connect_client(ports).await;
    for transition in CLIMB {
        client.set_transition(transition).await.unwrap();
    }
    let state = client.get_state().await.unwrap();
    assert_eq!(state, "running");

    client.set_state("reset").await.unwrap();
    let state = client.get_state().await.unwrap();
    assert_eq!(state, "reset");

    let cmstate = client.get_platform().await.unwrap();
    assert_eq!(cmstate, serde_json::json!({}));

    support::settle().await;
    let events = statuses.lock().unwrap();
    let status_events: Vec<_> = events.iter().filter(|e| e.header.key == "status").collect();
    let transitions: Vec<_> = status_events
        .iter()
        .map(|e| e.body["transition"].as_str().unwrap_or_default())
        .collect();
    let mut expected = CLIMB.to_vec();
    expected.extend_from_slice(&DESCENT);
    assert_eq!(transitions, expected);

    let error_events: Vec<_> = events.iter().filter(|e| e.header.key == "error").collect();
    assert!(error_events.is_empty(), "unexpected errors: {error_events:?}");
}
