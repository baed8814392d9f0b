//! A scriptable mock peer used by the manager's integration tests.
//!
//! Grounded on `crates/rt-test-utils/src/mock_ws_server.rs`'s accept-loop +
//! scripted-reply shape, turned around: here the *manager* is the server
//! under test, so the mock plays the peer side of the conversation,
//! connecting out to the manager's `back_pub`/`back_pull` ports.

use std::collections::BTreeMap;

use daq_protocol::{Envelope, ProcInfo};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// How a [`MockPeer`] answers one transition key.
#[derive(Debug, Clone)]
pub enum PeerBehavior {
    /// Reply with `{ok: true}` (or the `plat`/`alloc` body shape).
    Ack,
    /// Reply with a non-empty `err_info` map, simulating a peer-reported
    /// failure (spec.md §4.4, §7).
    ErrInfo(BTreeMap<String, String>),
    /// Don't reply at all, simulating an unresponsive peer (spec.md §8 S2).
    NoReply,
}

/// A peer that connects to a manager's `back_pub`/`back_pull` ports and
/// answers transitions according to a per-key script.
pub struct MockPeer {
    pub level: String,
    pub id: String,
    pub host: String,
    pub pid: u32,
    behaviors: BTreeMap<String, PeerBehavior>,
}

impl MockPeer {
    pub fn new(level: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            id: id.into(),
            host: "mock-host".to_string(),
            pid: 1,
            behaviors: BTreeMap::new(),
        }
    }

    /// Script a specific reply for one transition key. Unscripted keys
    /// default to [`PeerBehavior::Ack`].
    pub fn on(mut self, key: impl Into<String>, behavior: PeerBehavior) -> Self {
        self.behaviors.insert(key.into(), behavior);
        self
    }

    fn behavior_for(&self, key: &str) -> PeerBehavior {
        self.behaviors.get(key).cloned_or_ack()
    }

    /// Connect to the manager's `back_sub`/`back_push` endpoints and run
    /// until the connection to `back_pub` closes (i.e. the manager shuts
    /// down), answering every broadcast envelope per the script.
    pub fn spawn(self, host: &str, back_pub_port: u16, back_pull_port: u16) -> JoinHandle<()> {
        let host = host.to_string();
        tokio::spawn(async move {
            let (mut sub, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{back_pub_port}"))
                .await
                .expect("mock peer: connect to back_pub");
            let (mut push, _) = tokio_tungstenite::connect_async(format!("ws://{host}:{back_pull_port}"))
                .await
                .expect("mock peer: connect to back_pull");

            while let Some(Ok(msg)) = sub.next().await {
                let Message::Text(text) = msg else { continue };
                let Ok(command) = Envelope::from_json(&text) else { continue };
                match self.behavior_for(&command.header.key) {
                    PeerBehavior::NoReply => continue,
                    behavior => {
                        let reply = self.build_reply(&command, behavior);
                        let json = reply.to_json().expect("mock peer: encode reply");
                        if push.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn build_reply(&self, command: &Envelope, behavior: PeerBehavior) -> Envelope {
        let body = match (command.header.key.as_str(), behavior) {
            (_, PeerBehavior::ErrInfo(err_info)) => serde_json::json!({ "err_info": err_info }),
            ("plat", _) => serde_json::json!({
                (self.level.clone()): { "proc_info": ProcInfo { host: self.host.clone(), pid: self.pid } },
            }),
            ("alloc", _) => serde_json::json!({
                (self.level.clone()): { "connect_info": { "peer": self.id.clone() } },
            }),
            (_, PeerBehavior::Ack) => serde_json::json!({ "ok": true }),
            (_, PeerBehavior::NoReply) => Value::Null,
        };
        command.reply(&command.header.key, self.id.clone(), body)
    }
}

trait OrAck {
    fn cloned_or_ack(&self) -> PeerBehavior;
}

impl OrAck for Option<&PeerBehavior> {
    fn cloned_or_ack(&self) -> PeerBehavior {
        match self {
            Some(b) => (*b).clone(),
            None => PeerBehavior::Ack,
        }
    }
}
