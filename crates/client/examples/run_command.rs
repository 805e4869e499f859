//! Run a shell command on a device over TCP.
//!
//! Run with: cargo run --package client --example run_command -- <host> <port> <command...>

use std::time::Duration;

use client::{ClientConfig, ShellClient};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (host, port, command) = match (args.next(), args.next()) {
        (Some(host), Some(port)) => {
            let command = args.collect::<Vec<_>>().join(" ");
            (host, port.parse::<u16>()?, command)
        }
        _ => {
            eprintln!("usage: run_command <host> <port> <command...>");
            std::process::exit(2);
        }
    };
    let command = if command.is_empty() {
        "getprop ro.product.model".to_string()
    } else {
        command
    };

    if !ShellClient::is_reachable(&host, port, Duration::from_secs(5)) {
        anyhow::bail!("{host}:{port} is not reachable; is TCP debugging enabled?");
    }

    let mut config = ClientConfig::load_default()?;
    config.apply_env_overrides();
    config.device.host = host;
    config.device.port = port;

    let mut shell = ShellClient::connect(&config)?;
    if let Some(device) = shell.device_info() {
        eprintln!("connected: {}", device.banner);
    }

    let output = shell.execute_command(&command, true)?;
    print!("{output}");

    shell.close();
    Ok(())
}
