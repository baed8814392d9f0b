use std::collections::BTreeSet;
use std::time::Duration;

use daq_protocol::{Envelope, MsgIdGenerator, PeerRecord};
use daq_state::{route, Engine, State, Transition, TransitionError};
use daq_ui_log::UiLogger;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::registry::{level_of, CmState, Ids};
use crate::transport::FrontRepRequest;

const ALLOC_DEADLINE: Duration = Duration::from_millis(1000);
const CONNECT_DEADLINE: Duration = Duration::from_millis(5000);
const DRP_DEADLINE: Duration = Duration::from_millis(1000);
const PLAT_WINDOW: Duration = Duration::from_millis(1000);

/// A guard's failure, distinguishing a generic "N clients did not respond"
/// message from one or more peer-reported `err_info` entries, each of
/// which gets its own `front_pub` error envelope (spec.md §4.4, §7).
enum GuardError {
    Generic(String),
    PeerReported(Vec<(String, String)>),
}

/// Owns `cmstate`/`ids` and the state machine; the only thing in the
/// manager allowed to touch either (spec.md §5, §9).
pub struct Coordinator {
    engine: Engine,
    cmstate: CmState,
    ids: Ids,
    msg_gen: MsgIdGenerator,
    back_pub_tx: broadcast::Sender<String>,
    front_pub_tx: broadcast::Sender<String>,
    back_pull_rx: mpsc::Receiver<Envelope>,
    ui_log: UiLogger<String>,
}

impl Coordinator {
    pub fn new(
        back_pub_tx: broadcast::Sender<String>,
        front_pub_tx: broadcast::Sender<String>,
        back_pull_rx: mpsc::Receiver<Envelope>,
    ) -> Self {
        let ui_log = UiLogger::with_buffer(front_pub_tx.clone(), |entry| entry, 100);
        Self {
            engine: Engine::new(),
            cmstate: CmState::new(),
            ids: Ids::new(),
            msg_gen: MsgIdGenerator::new(),
            back_pub_tx,
            front_pub_tx,
            back_pull_rx,
            ui_log,
        }
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    /// The main loop: serialize every `front_rep` request through this one
    /// task (spec.md §4.4, §5). Runs until `requests` closes (listener
    /// shutdown).
    pub async fn run(mut self, mut requests: mpsc::Receiver<FrontRepRequest>, autoconnect: bool) {
        if autoconnect {
            tracing::info!("autoconnect: walking reset -> connected");
            if let Err((_, e)) = self.walk_toward(State::Connected).await {
                tracing::warn!(error = %e, "autoconnect sequence failed");
            }
        }
        while let Some(req) = requests.recv().await {
            self.handle_request(req.envelope, req.reply_tx).await;
        }
    }

    /// Dispatch one `front_rep` request. For a bare transition name or a
    /// `setstate.<target>`, the reply is sent as soon as it is known to be
    /// well-formed — *before* the (possibly slow) guard runs — matching
    /// spec.md §4.4's "send ok immediately, then fire the transition".
    /// Serialization (spec.md §5) still holds: this call does not return
    /// to `run`'s `recv` loop until the guard/walk has finished, so the
    /// next queued request is not picked up early.
    async fn handle_request(&mut self, request: Envelope, reply_tx: tokio::sync::oneshot::Sender<Envelope>) {
        let key = request.header.key.clone();
        if let Some(target) = key.strip_prefix("setstate.") {
            return self.handle_setstate(&request, target, reply_tx).await;
        }
        if let Some(transition) = Transition::parse(&key) {
            let ack = request.reply(&key, "manager", serde_json::json!({"ok": true}));
            let _ = reply_tx.send(ack);
            if let Err(e) = self.fire_transition(transition).await {
                tracing::warn!(transition = %transition, error = %e, "transition failed");
            }
            return;
        }
        let reply = match key.as_str() {
            "getstate" => {
                let body = serde_json::to_value(&self.cmstate).unwrap_or(Value::Null);
                request.reply(self.state().as_str(), "manager", body)
            }
            "getstatus" => {
                let body = serde_json::json!({
                    "state": self.state().as_str(),
                    "transition": self.engine.last_transition().map(Transition::as_str),
                });
                request.reply("status", "manager", body)
            }
            "selectplatform" => self.handle_selectplatform(&request),
            _ => request.reply("error", "manager", serde_json::json!({"error": format!("unknown key: {key}")})),
        };
        let _ = reply_tx.send(reply);
    }

    async fn handle_setstate(
        &mut self,
        request: &Envelope,
        target: &str,
        reply_tx: tokio::sync::oneshot::Sender<Envelope>,
    ) {
        let Some(target_state) = State::parse(target) else {
            let reply = request.reply(
                "error",
                "manager",
                serde_json::json!({"error": format!("unrecognized target state: {target}")}),
            );
            let _ = reply_tx.send(reply);
            return;
        };
        let ack = request.reply("setstate", "manager", serde_json::json!({"ok": true}));
        let _ = reply_tx.send(ack);
        if let Err((fired, e)) = self.walk_toward(target_state).await {
            tracing::warn!(target, steps = fired.len(), error = %e, "setstate walk aborted");
        }
    }

    fn handle_selectplatform(&mut self, request: &Envelope) -> Envelope {
        if self.state() != State::Unallocated {
            return request.reply(
                "error",
                "manager",
                serde_json::json!({"error": format!(
                    "selectplatform requires state unallocated, currently {}",
                    self.state()
                )}),
            );
        }
        if let Some(flags) = request.body.as_object() {
            for (id, active) in flags {
                let Some(active) = active.as_bool() else { continue };
                for peers in self.cmstate.values_mut() {
                    if let Some(record) = peers.get_mut(id) {
                        record.active = active;
                    }
                }
            }
        }
        request.reply("selectplatform", "manager", serde_json::json!({"ok": true}))
    }

    /// Walk toward `target`, firing the routed transition at each step
    /// (spec.md §4.3). Mirrors `daq_state::Engine::walk_toward`'s
    /// algorithm but async, since guards here do real socket I/O.
    async fn walk_toward(
        &mut self,
        target: State,
    ) -> Result<Vec<Transition>, (Vec<Transition>, TransitionError)> {
        let mut fired = Vec::new();
        while self.state() != target {
            let Some(transition) = route(self.state(), target) else {
                return Err((fired, TransitionError::NoRoute { from: self.state(), to: target }));
            };
            match self.fire_transition(transition).await {
                Ok(_) => fired.push(transition),
                Err(e) => return Err((fired, e)),
            }
        }
        Ok(fired)
    }

    /// Run the transition's guard (real async I/O against peers) and, if
    /// legal and successful, advance the engine and publish status.
    async fn fire_transition(&mut self, transition: Transition) -> Result<State, TransitionError> {
        if transition.apply(self.state()).is_none() {
            let err = TransitionError::NoSuchEdge { transition, from: self.state() };
            self.publish_error(&err.to_string());
            return Err(err);
        }
        let outcome = self.run_condition(transition).await;
        let (fire_result, to_publish): (Result<(), String>, Vec<String>) = match outcome {
            Ok(()) => (Ok(()), Vec::new()),
            Err(GuardError::Generic(msg)) => (Err(msg.clone()), vec![msg]),
            Err(GuardError::PeerReported(entries)) => {
                let lines: Vec<String> =
                    entries.iter().map(|(node, msg)| format!("{node}: {msg}")).collect();
                let summary = lines.join("; ");
                (Err(summary), lines)
            }
        };
        let result = self.engine.fire(transition, || fire_result);
        for line in &to_publish {
            self.publish_error(line);
        }
        if let Ok(state) = result {
            self.ui_log.log(format!("{transition} -> {state}"));
            self.publish_status();
        }
        result
    }

    fn publish_status(&self) {
        let body = serde_json::json!({
            "state": self.state().as_str(),
            "transition": self.engine.last_transition().map(Transition::as_str),
        });
        self.publish_on_front_pub("status", body);
    }

    fn publish_error(&self, message: &str) {
        tracing::error!(%message, "transition guard error");
        self.publish_on_front_pub("error", serde_json::json!({"error": message}));
    }

    fn publish_on_front_pub(&self, key: &str, body: Value) {
        let envelope = Envelope::new(key, self.msg_gen.next_id(), body).with_sender("manager");
        if let Ok(json) = envelope.to_json() {
            let _ = self.front_pub_tx.send(json);
        }
    }

    fn broadcast(&self, key: &str, msg_id: &daq_protocol::MsgId, body: Value) {
        let envelope = Envelope::new(key, *msg_id, body).with_sender("manager");
        if let Ok(json) = envelope.to_json() {
            let _ = self.back_pub_tx.send(json);
        }
    }

    /// Collect every reply carrying `msg_id` during `deadline`, regardless
    /// of count (used by `plat`, which doesn't know who's out there yet).
    async fn collect_during(&mut self, msg_id: &str, deadline: Duration) -> Vec<Envelope> {
        let mut accepted = Vec::new();
        let start = Instant::now();
        loop {
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                break;
            }
            match tokio::time::timeout(deadline - elapsed, self.back_pull_rx.recv()).await {
                Ok(Some(env)) if env.header.msg_id == msg_id => accepted.push(env),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        accepted
    }

    /// The response-collection algorithm of spec.md §4.4: discard replies
    /// with the wrong `msg_id`; of the remainder, accept those whose
    /// `sender_id` is still expected; stop when the expected set empties or
    /// the deadline elapses. Returns `(missing_count, accepted)`.
    async fn collect_responses(
        &mut self,
        msg_id: &str,
        mut expected: BTreeSet<String>,
        deadline: Duration,
    ) -> (usize, Vec<Envelope>) {
        let mut accepted = Vec::new();
        let start = Instant::now();
        while !expected.is_empty() {
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                break;
            }
            match tokio::time::timeout(deadline - elapsed, self.back_pull_rx.recv()).await {
                Ok(Some(env)) => {
                    if env.header.msg_id != msg_id {
                        continue;
                    }
                    if let Some(sender) = env.header.sender_id.clone() {
                        if expected.remove(&sender) {
                            accepted.push(env);
                        }
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
        (expected.len(), accepted)
    }

    async fn run_condition(&mut self, transition: Transition) -> Result<(), GuardError> {
        match transition {
            Transition::Plat => self.condition_plat().await,
            Transition::Alloc => self.condition_alloc().await,
            Transition::Dealloc => self.condition_trivial("dealloc").await,
            Transition::Connect => self.condition_connect().await,
            Transition::Disconnect => self.condition_trivial("disconnect").await,
            Transition::Configure => self.condition_drp_gated("configure").await,
            Transition::Unconfigure => self.condition_drp_gated("unconfigure").await,
            Transition::Enable => self.condition_drp_gated("enable").await,
            Transition::Disable => self.condition_drp_gated("disable").await,
            Transition::BeginRecord => self.condition_drp_gated("beginrecord").await,
            Transition::EndRecord => self.condition_drp_gated("endrecord").await,
            Transition::ConfigUpdate => self.condition_trivial("configupdate").await,
            Transition::Reset => self.condition_reset().await,
        }
    }

    async fn condition_plat(&mut self) -> Result<(), GuardError> {
        self.cmstate.clear();
        self.ids.clear();
        let msg_id = self.msg_gen.next_id();
        self.broadcast("plat", &msg_id, serde_json::json!({}));
        let msg_id_str = msg_id.to_string();
        let replies = self.collect_during(&msg_id_str, PLAT_WINDOW).await;
        for env in replies {
            let Some(sender) = env.header.sender_id.clone() else { continue };
            let Some(obj) = env.body.as_object() else { continue };
            for (level, info) in obj {
                let Some(proc_info_value) = info.get("proc_info") else { continue };
                let Ok(proc_info) = serde_json::from_value(proc_info_value.clone()) else { continue };
                let record = PeerRecord::new(level.clone(), sender.clone(), proc_info);
                self.cmstate.entry(level.clone()).or_default().insert(sender.clone(), record);
                self.ids.insert(sender.clone());
            }
        }
        Ok(())
    }

    async fn condition_alloc(&mut self) -> Result<(), GuardError> {
        let expected = self.ids.clone();
        let msg_id = self.msg_gen.next_id();
        self.broadcast("alloc", &msg_id, serde_json::json!({}));
        let (missing, replies) =
            self.collect_responses(&msg_id.to_string(), expected, ALLOC_DEADLINE).await;
        if missing > 0 {
            return Err(GuardError::Generic(format!(
                "{missing} client{} did not respond to alloc",
                plural(missing)
            )));
        }
        for env in replies {
            let Some(sender) = env.header.sender_id.clone() else { continue };
            let Some(obj) = env.body.as_object() else { continue };
            for (level, info) in obj {
                let Some(connect_info) = info.get("connect_info") else { continue };
                if let Some(record) = self.cmstate.get_mut(level).and_then(|m| m.get_mut(&sender)) {
                    record.connect_info = connect_info.clone();
                }
            }
        }
        for peers in self.cmstate.values_mut() {
            for (index, record) in peers.values_mut().enumerate() {
                record.level_index = index;
            }
        }
        Ok(())
    }

    async fn condition_connect(&mut self) -> Result<(), GuardError> {
        let expected = self.ids.clone();
        let msg_id = self.msg_gen.next_id();
        let body = serde_json::to_value(&self.cmstate).unwrap_or(Value::Null);
        self.broadcast("connect", &msg_id, body);
        let (missing, _replies) =
            self.collect_responses(&msg_id.to_string(), expected, CONNECT_DEADLINE).await;
        if missing > 0 {
            return Err(GuardError::Generic(format!(
                "{missing} client{} did not respond to connect",
                plural(missing)
            )));
        }
        Ok(())
    }

    /// Shared guard for `configure`/`unconfigure`/`enable`/`disable`/
    /// `beginrecord`/`endrecord`: only peers in a `drp*` level are expected
    /// to answer (spec.md §4.4).
    async fn condition_drp_gated(&mut self, name: &str) -> Result<(), GuardError> {
        let expected: BTreeSet<String> = self
            .ids
            .iter()
            .filter(|id| level_of(&self.cmstate, id).is_some_and(|level| level.starts_with("drp")))
            .cloned()
            .collect();
        let msg_id = self.msg_gen.next_id();
        self.broadcast(name, &msg_id, serde_json::json!({}));
        let (missing, replies) =
            self.collect_responses(&msg_id.to_string(), expected, DRP_DEADLINE).await;
        if missing > 0 {
            return Err(GuardError::Generic(format!(
                "{missing} client{} did not respond to {name}",
                plural(missing)
            )));
        }
        let mut entries = Vec::new();
        for env in &replies {
            let Some(err_info) = env.body.get("err_info").and_then(Value::as_object) else {
                continue;
            };
            for (node, message) in err_info {
                if let Some(message) = message.as_str() {
                    entries.push((node.clone(), message.to_string()));
                }
            }
        }
        if entries.is_empty() {
            Ok(())
        } else {
            Err(GuardError::PeerReported(entries))
        }
    }

    /// `dealloc`/`disconnect`/`configupdate`: unconditional successes
    /// (Open Question decision, SPEC_FULL §9).
    async fn condition_trivial(&mut self, name: &str) -> Result<(), GuardError> {
        let msg_id = self.msg_gen.next_id();
        self.broadcast(name, &msg_id, serde_json::json!({}));
        Ok(())
    }

    async fn condition_reset(&mut self) -> Result<(), GuardError> {
        let msg_id = self.msg_gen.next_id();
        self.broadcast("reset", &msg_id, serde_json::json!({}));
        self.cmstate.clear();
        self.ids.clear();
        Ok(())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
