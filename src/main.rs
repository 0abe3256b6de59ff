use anyhow::{Context, Result};
use clap::Parser;
use fan_plate::{transport, Console, Controller, PanelConfig, Profile};
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use strum::IntoEnumIterator;
use tokio::io::BufReader;

/// Send angle commands to the fan-plate controller and watch its ADC readings
#[derive(Parser, Debug)]
#[command(name = "fan-plate", version, about, long_about = None)]
struct Cli {
    /// Serial device (e.g. /dev/ttyUSB0, COM4)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Read / acknowledgement timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Built-in angle set (classic, extended)
    #[arg(long)]
    profile: Option<Profile>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// List built-in angle sets and exit
    #[arg(long)]
    list_profiles: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn resolve_config(cli: &Cli) -> Result<PanelConfig> {
    let mut config = match &cli.config {
        Some(path) => PanelConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PanelConfig::default(),
    };

    if let Some(profile) = cli.profile {
        config = config.with_profile(profile);
    }
    if let Some(port) = &cli.port {
        config = config.with_device(port);
    }
    if let Some(baud) = cli.baud {
        config = config.with_baud_rate(baud);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(Duration::from_millis(ms));
    }

    config.validate()?;
    Ok(config)
}

fn log_available_ports() {
    match transport::list_ports() {
        Ok(ports) if ports.is_empty() => warn!("No serial ports found"),
        Ok(ports) => {
            for port in ports {
                info!("Available port: {}", port);
            }
        }
        Err(e) => warn!("{}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if cli.list_ports {
        for port in transport::list_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    if cli.list_profiles {
        for profile in Profile::iter() {
            let displayable: Vec<String> = profile.displayable().iter().map(|a| a.to_string()).collect();
            println!(
                "{}: send {} / label {}",
                profile,
                profile.allow_list().join(", "),
                displayable.join(", ")
            );
        }
        return Ok(());
    }

    log_available_ports();
    let config = resolve_config(&cli)?;

    let controller = match Controller::connect(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    Console::new(controller)
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context("Console input failed")?;

    Ok(())
}
