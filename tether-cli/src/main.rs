//! Command line tool for Tether devices
//!
//! Scans for nearby devices and checks device commands offline.

mod render;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tether_ble::{BleScanner, Classifier};
use tether_core::params::parse_arguments;
use tether_core::{catalog, config_path, tether_home, DiscoverySession, ParamInputs, ScanUpdate, TetherConfig};

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Discover Tether devices and check device commands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for nearby devices until stopped or the scan ceiling is reached
    Scan {
        /// Override the scan ceiling in seconds
        #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
        duration: Option<u64>,
    },
    /// List every device command and its parameters
    Commands,
    /// Validate parameters for a command and print the typed arguments
    Check {
        /// Command key, e.g. control-device
        key: String,
        /// Parameter as name=value; repeat for each parameter
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Print the configuration, or write the defaults with --init
    Config {
        #[arg(long)]
        init: bool,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { duration } => {
            let config = TetherConfig::load(&config_path(&tether_home()?))?;
            let ceiling = duration.map(Duration::from_secs).unwrap_or_else(|| config.scan_ceiling());
            scan(&config, ceiling).await?;
        }
        Commands::Commands => print!("{}", render::catalog()),
        Commands::Check { key, params } => {
            let def = catalog::lookup(&key).ok_or_else(|| format!("unknown command `{key}`"))?;
            let inputs: ParamInputs = params.into_iter().collect();
            let args = parse_arguments(def, &inputs)?;
            println!("{}", serde_json::to_string_pretty(&render::arguments_json(def, &args))?);
        }
        Commands::Config { init } => {
            let path = config_path(&tether_home()?);
            if init && !path.exists() {
                TetherConfig::default().save(&path)?;
                println!("Wrote {}", path.display());
            }
            let config = TetherConfig::load(&path)?;
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn scan(config: &TetherConfig, ceiling: Duration) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Classifier::new(&config.known_type_a_prefix, &config.known_type_b_prefix);
    let scanner = BleScanner::new(classifier).await?;
    let mut session = DiscoverySession::new(Arc::new(scanner), ceiling, config.scan_tick());

    println!("Scanning for devices (up to {} seconds, Ctrl-C to stop)...", ceiling.as_secs());
    session.start().await?;

    let mut printed = HashSet::new();
    loop {
        let update = tokio::select! {
            update = session.next_update() => Some(update),
            _ = tokio::signal::ctrl_c() => None,
        };
        match update {
            None => {
                session.stop().await;
                break;
            }
            Some(None) | Some(Some(ScanUpdate::Stopped(_))) => break,
            Some(Some(ScanUpdate::Sighted(identity))) => {
                if printed.insert(identity.clone()) {
                    if let Some(device) = session.find(&identity) {
                        println!("{}", render::device_line(device));
                    }
                }
            }
            Some(Some(ScanUpdate::Tick(elapsed))) => log::trace!("scanning for {elapsed:?}"),
        }
    }

    println!("\nFound {} devices in {:.1}s:", session.devices().len(), session.elapsed().as_secs_f32());
    for device in session.devices() {
        println!("{}", render::device_line(device));
    }
    if let Some(notice) = session.notice() {
        println!("\n{}", notice.text);
    }
    Ok(())
}
