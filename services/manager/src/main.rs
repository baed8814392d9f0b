use clap::{Arg, ArgAction, Command};
use daq_protocol::Ports;

fn cli() -> Command {
    Command::new("manager")
        .about("Collection Manager for the partition control plane")
        .arg(
            Arg::new("platform")
                .short('p')
                .long("platform")
                .value_parser(clap::value_parser!(u8).range(0..=7))
                .default_value("0")
                .help("platform integer 0..7"),
        )
        .arg(
            Arg::new("autoconnect")
                .short('a')
                .long("autoconnect")
                .action(ArgAction::SetTrue)
                .help("run plat -> alloc -> connect on startup"),
        )
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::SetTrue))
        .arg(
            Arg::new("bind-host")
                .long("bind-host")
                .default_value("0.0.0.0")
                .help("interface to bind the four control-plane ports on"),
        )
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
    let autoconnect = matches.get_flag("autoconnect");
    let bind_host: &String = matches.get_one("bind-host").unwrap();
    let ports = Ports::for_platform(platform);

    tracing::info!(
        platform,
        back_pull = ports.back_pull,
        back_pub = ports.back_pub,
        front_rep = ports.front_rep,
        front_pub = ports.front_pub,
        "starting collection manager"
    );

    let handle = match manager::spawn(bind_host, ports, autoconnect).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("manager: failed to bind ports: {e}");
            std::process::exit(1);
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt, shutting down");
        }
        _ = handle.join => {
            tracing::warn!("coordinator task exited unexpectedly");
        }
    }
}
