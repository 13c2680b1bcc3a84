//! Thin command-line front end for the Pulse Pal session.
//!
//! ```text
//! pulsepal [config.toml] info                 -- handshake and report firmware
//! pulsepal [config.toml] defaults             -- reset device to factory defaults
//! pulsepal [config.toml] trigger 1,3          -- soft-trigger output channels
//! pulsepal [config.toml] abort                -- stop all playing trains
//! pulsepal [config.toml] apply protocol.toml  -- sync a saved parameter file
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pulsepal_client::config::{self, ClientConfig};
use pulsepal_client::session::PulsePal;
use pulsepal_client::transport::serial::SerialTransport;

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // An optional leading .toml argument selects the config file.
    let config_path = if args.first().is_some_and(|a| a.ends_with(".toml")) {
        PathBuf::from(args.remove(0))
    } else {
        PathBuf::from("pulsepal.toml")
    };
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.client.log_level.clone())),
        )
        .init();

    let Some(command) = args.first() else {
        bail!("no command given; expected one of: info, defaults, trigger, abort, apply");
    };

    let mut pal = connect(&cfg)?;
    match command.as_str() {
        "info" => {
            println!(
                "firmware {} ({:?})",
                pal.firmware_version(),
                pal.generation()
            );
        }
        "defaults" => {
            pal.set_default_params()?;
            info!("device reset to factory defaults");
        }
        "trigger" => {
            let spec = args.get(1).map(String::as_str).unwrap_or("1");
            pal.trigger(parse_channel_list(spec)?)?;
        }
        "abort" => {
            pal.abort_pulse_trains()?;
        }
        "apply" => {
            let Some(file) = args.get(1) else {
                bail!("apply requires a parameter file path");
            };
            let store = config::load_parameter_file(Path::new(file))
                .with_context(|| format!("loading parameter file {file}"))?;
            pal.apply_store(store)?;
            info!(file, "parameter file synced to device");
        }
        other => bail!("unknown command {other:?}"),
    }
    pal.disconnect()?;
    Ok(())
}

fn connect(cfg: &ClientConfig) -> anyhow::Result<PulsePal<SerialTransport>> {
    let transport = SerialTransport::open(
        &cfg.device.port,
        cfg.device.baud_rate,
        Duration::from_millis(cfg.device.timeout_ms),
    )
    .with_context(|| format!("opening serial port {}", cfg.device.port))?;
    Ok(PulsePal::connect_with_name(transport, &cfg.client.name)?)
}

/// Parses a comma-separated channel list such as `1,3` into the trigger
/// bitmap.
fn parse_channel_list(spec: &str) -> anyhow::Result<[bool; 4]> {
    let mut channels = [false; 4];
    for part in spec.split(',') {
        match part.trim().parse::<usize>() {
            Ok(n @ 1..=4) => channels[n - 1] = true,
            _ => bail!("invalid output channel {part:?} (valid: 1-4)"),
        }
    }
    Ok(channels)
}
