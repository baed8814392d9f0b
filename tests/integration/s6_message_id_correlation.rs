//! S6 — Message-id correlation (spec.md §8): a reply stamped with a stale
//! `msg_id` (simulating a response that arrives after its own round has
//! already closed) must never be folded into `cmstate`, in either of two
//! successive `plat` rounds.

#[path = "support.rs"]
mod support;

use daq_protocol::{Envelope, MsgId};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

/// Connects to `back_pub`/`back_pull` like a real peer, but answers every
/// `plat` broadcast with a fixed, always-wrong `msg_id` — the reply a
/// straggler from a previous round would produce.
fn spawn_stale_responder(host: &str, back_pub_port: u16, back_pull_port: u16) {
    let host = host.to_string();
    tokio::spawn(async move {
        let (mut sub, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{back_pub_port}"))
            .await
            .expect("stale responder: connect to back_pub");
        let (mut push, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{back_pull_port}"))
            .await
            .expect("stale responder: connect to back_pull");

        while let Some(Ok(msg)) = sub.next().await {
            let Message::Text(text) = msg else { continue };
            let Ok(command) = Envelope::from_json(&text) else { continue };
            if command.header.key != "plat" {
                continue;
            }
            let stale = Envelope::new(
                "plat",
                MsgId::new(1, 1),
                serde_json::json!({ "ghost0": { "proc_info": { "host": "stale", "pid": 0 } } }),
            )
            .with_sender("ghost");
            let json = stale.to_json().expect("stale responder: encode reply");
            if push.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });
}

#[tokio::test]
async fn stale_msg_id_never_registers_across_two_plat_rounds() {
    let (_handle, ports) = support::spawn_manager(5).await;
    support::spawn_drp_peer(ports, "peer-a");
    spawn_stale_responder("127.0.0.1", ports.back_pub, ports.back_pull);
    support::settle().await;

    let mut client = support::connect_client(ports).await;

    // Round 1.
    client.set_transition("plat").await.unwrap();
    let cmstate = client.get_platform().await.unwrap();
    let drp0 = cmstate.get("drp0").expect("peer-a should have registered");
    assert!(drp0.get("peer-a").is_some());
    assert!(drp0.get("ghost").is_none(), "stale-msg_id reply leaked into cmstate: {cmstate:?}");
    assert_eq!(drp0.as_object().map(|m| m.len()), Some(1));

    // Back to reset, then a second round — the stale responder answers
    // with the exact same fixed (and still wrong) msg_id both times.
    client.set_transition("reset").await.unwrap();
    client.set_transition("plat").await.unwrap();

    let cmstate = client.get_platform().await.unwrap();
    let drp0 = cmstate.get("drp0").expect("peer-a should have re-registered");
    assert!(drp0.get("peer-a").is_some());
    assert!(drp0.get("ghost").is_none(), "stale-msg_id reply leaked into cmstate: {cmstate:?}");
    assert_eq!(drp0.as_object().map(|m| m.len()), Some(1));
}
