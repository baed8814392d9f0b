use std::time::Duration;

use clap::{Arg, Command};
use daq_control::ControlClient;
use daq_protocol::Ports;

fn cli() -> Command {
    Command::new("daqctl")
        .about("Operator CLI for the partition control plane")
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .value_parser(clap::value_parser!(u8).range(0..=7))
                .default_value("0")
                .global(true),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .default_value("127.0.0.1")
                .global(true),
        )
        .subcommand(Command::new("getstate").about("print the manager's current state and cmstate"))
        .subcommand(Command::new("getstatus").about("print (state, last transition)"))
        .subcommand(
            Command::new("set-state")
                .about("drive the manager toward a target state")
                .arg(Arg::new("target").required(true)),
        )
        .subcommand(
            Command::new("set-transition")
                .about("fire a single named transition")
                .arg(Arg::new("transition").required(true)),
        )
        .subcommand(
            Command::new("watch")
                .about("print front_pub status/error envelopes for a few seconds"),
        )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
        .init();

    let matches = cli().get_matches();
    let platform: u8 = *matches.get_one("platform").unwrap();
    let host: &String = matches.get_one("host").unwrap();
    let ports = Ports::for_platform(platform);

    let result = match matches.subcommand() {
        Some(("getstate", _)) => run_getstate(host, ports).await,
        Some(("getstatus", _)) => run_getstatus(host, ports).await,
        Some(("set-state", sub)) => {
            let target: &String = sub.get_one("target").unwrap();
            run_set_state(host, ports, target).await
        }
        Some(("set-transition", sub)) => {
            let transition: &String = sub.get_one("transition").unwrap();
            run_set_transition(host, ports, transition).await
        }
        Some(("watch", _)) => run_watch(host, ports).await,
        _ => {
            eprintln!("daqctl: no subcommand given; try `daqctl --help`");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("daqctl: {e}");
        std::process::exit(1);
    }
}

async fn connect(host: &str, ports: Ports) -> Result<ControlClient, daq_control::ControlError> {
    ControlClient::connect(host, ports.front_rep, Duration::from_secs(5)).await
}

async fn run_getstate(host: &str, ports: Ports) -> Result<(), daq_control::ControlError> {
    let mut client = connect(host, ports).await?;
    let state = client.get_state().await?;
    let platform = client.get_platform().await?;
    println!("state: {state}");
    println!("cmstate: {}", serde_json::to_string_pretty(&platform).unwrap_or_default());
    Ok(())
}

async fn run_getstatus(host: &str, ports: Ports) -> Result<(), daq_control::ControlError> {
    let mut client = connect(host, ports).await?;
    let (transition, state) = client.get_status().await?;
    println!("state: {state}");
    println!("last transition: {}", transition.as_deref().unwrap_or("none"));
    Ok(())
}

async fn run_set_state(host: &str, ports: Ports, target: &str) -> Result<(), daq_control::ControlError> {
    let mut client = connect(host, ports).await?;
    match client.set_state(target).await? {
        None => println!("ok"),
        Some(err) => println!("error: {err}"),
    }
    Ok(())
}

async fn run_set_transition(
    host: &str,
    ports: Ports,
    transition: &str,
) -> Result<(), daq_control::ControlError> {
    let mut client = connect(host, ports).await?;
    match client.set_transition(transition).await? {
        None => println!("ok"),
        Some(err) => println!("error: {err}"),
    }
    Ok(())
}

async fn run_watch(host: &str, ports: Ports) -> Result<(), daq_control::ControlError> {
    let (monitor, join) = daq_control::StatusMonitor::spawn(host, ports.front_pub, |env| {
        println!("{}: {}", env.header.key, env.body);
    })
    .await
    .map_err(daq_control::ControlError::Transport)?;
    tokio::time::sleep(Duration::from_secs(10)).await;
    monitor.stop();
    let _ = join.await;
    Ok(())
}
