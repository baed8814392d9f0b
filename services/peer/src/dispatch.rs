use std::collections::BTreeMap;

use daq_protocol::{Envelope, ProcInfo};

/// A scripted failure for one transition, used by tests and the peer's
/// `--fail` CLI flag to exercise the manager's peer-reported-error path
/// (spec.md §8 S4).
#[derive(Debug, Clone)]
pub struct PeerFailure {
    pub transition: String,
    pub err_info: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub id: String,
    pub level: String,
    pub host: String,
    pub pid: u32,
    pub failure: Option<PeerFailure>,
}

/// Dispatch one envelope from the manager and build the reply, or `None`
/// if this peer does not answer this key at all (spec.md §4.2).
///
/// `configure`/`unconfigure`/`enable`/`disable`/`beginrecord`/`endrecord`
/// are answered only when `config.level` starts with `drp`, mirroring the
/// original's `condition_common` restriction on the expected-responder set
/// (SPEC_FULL §4.2 [ADD]).
pub fn handle(config: &PeerConfig, command: &Envelope) -> Option<Envelope> {
    let key = command.header.key.as_str();
    let drp_only = matches!(
        key,
        "configure" | "unconfigure" | "enable" | "disable" | "beginrecord" | "endrecord"
    );
    if drp_only && !config.level.starts_with("drp") {
        return None;
    }

    if let Some(failure) = &config.failure {
        if failure.transition == key {
            let body = serde_json::json!({ "err_info": failure.err_info });
            return Some(command.reply(key, config.id.clone(), body));
        }
    }

    let body = match key {
        "plat" => serde_json::json!({
            (config.level.clone()): {
                "proc_info": ProcInfo { host: config.host.clone(), pid: config.pid },
            },
        }),
        "alloc" => serde_json::json!({
            (config.level.clone()): {
                "connect_info": { "host": config.host.clone(), "port": 0 },
            },
        }),
        "connect" | "disconnect" | "configure" | "unconfigure" | "enable" | "disable"
        | "beginrecord" | "endrecord" | "configupdate" | "reset" => serde_json::json!({ "ok": true }),
        _ => return None,
    };
    Some(command.reply(key, config.id.clone(), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use daq_protocol::MsgId;

    fn config(level: &str) -> PeerConfig {
        PeerConfig {
            id: "peer-1".into(),
            level: level.into(),
            host: "h".into(),
            pid: 1,
            failure: None,
        }
    }

    #[test]
    fn plat_replies_with_level_keyed_proc_info() {
        let cfg = config("drp0");
        let cmd = Envelope::new("plat", MsgId::new(1, 0), serde_json::json!({}));
        let reply = handle(&cfg, &cmd).unwrap();
        assert_eq!(reply.header.key, "plat");
        assert_eq!(reply.header.msg_id, cmd.header.msg_id);
        assert!(reply.body["drp0"]["proc_info"]["host"] == "h");
    }

    #[test]
    fn non_drp_peer_drops_configure() {
        let cfg = config("teb0");
        let cmd = Envelope::new("configure", MsgId::new(1, 0), serde_json::json!({}));
        assert!(handle(&cfg, &cmd).is_none());
    }

    #[test]
    fn drp_peer_answers_configure() {
        let cfg = config("drp0");
        let cmd = Envelope::new("configure", MsgId::new(1, 0), serde_json::json!({}));
        assert!(handle(&cfg, &cmd).is_some());
    }

    #[test]
    fn scripted_failure_produces_err_info() {
        let mut cfg = config("drp0");
        let mut err_info = BTreeMap::new();
        err_info.insert("node7".to_string(), "FPGA link down".to_string());
        cfg.failure = Some(PeerFailure { transition: "configure".into(), err_info: err_info.clone() });
        let cmd = Envelope::new("configure", MsgId::new(1, 0), serde_json::json!({}));
        let reply = handle(&cfg, &cmd).unwrap();
        assert_eq!(reply.body["err_info"]["node7"], "FPGA link down");
    }

    #[test]
    fn unknown_key_yields_no_reply() {
        let cfg = config("drp0");
        let cmd = Envelope::new("frobnicate", MsgId::new(1, 0), serde_json::json!({}));
        assert!(handle(&cfg, &cmd).is_none());
    }
}
