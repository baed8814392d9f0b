use std::collections::BTreeMap;

use clap::{Arg, ArgAction, Command};
use daq_protocol::Ports;
use peer::{peer_id, PeerConfig, PeerFailure};

fn cli() -> Command {
    Command::new("peer")
        .about("Peer client stub for the partition control plane")
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .value_parser(clap::value_parser!(u8).range(0..=7))
                .default_value("0"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .default_value("127.0.0.1")
                .help("manager host to connect to"),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("level")
                .default_value("drp0")
                .help("peer level, e.g. drp0, teb0, meb0"),
        )
        .arg(Arg::new("verbose").short('v').action(ArgAction::SetTrue))
        .arg(
            Arg::new("fail")
                .long("fail")
                .value_name("TRANSITION=NODE:MESSAGE")
                .help("reply to TRANSITION with an err_info entry instead of success"),
        )
}

fn parse_fail(spec: &str) -> Option<PeerFailure> {
    let (transition, rest) = spec.split_once('=')?;
    let (node, message) = rest.split_once(':')?;
    let mut err_info = BTreeMap::new();
    err_info.insert(node.to_string(), message.to_string());
    Some(PeerFailure { transition: transition.to_string(), err_info })
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let verbose = matches.get_flag("verbose");
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let platform: u8 = *matches.get_one("platform").unwrap();
    let host: &String = matches.get_one("host").unwrap();
    let level: &String = matches.get_one("level").unwrap();
    let failure = matches.get_one::<String>("fail").and_then(|s| parse_fail(s));
    if matches.contains_id("fail") && failure.is_none() {
        eprintln!("peer: --fail must look like TRANSITION=NODE:MESSAGE");
        std::process::exit(2);
    }

    let pid = std::process::id();
    let id = peer_id(host, pid);
    let config = PeerConfig {
        id,
        level: level.clone(),
        host: host.clone(),
        pid,
        failure,
    };
    let ports = Ports::for_platform(platform);

    if let Err(e) = peer::run(host, ports, config).await {
        tracing::error!(error = %e, "peer exited with an error");
        std::process::exit(1);
    }
}
