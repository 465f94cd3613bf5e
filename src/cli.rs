use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use packetscope::core::layers::format_mac;
use packetscope::{list_devices, CaptureConfig, CaptureSession, CapturedPacket};

#[derive(Parser)]
#[command(name = "packetscope")]
#[command(author, version, about = "Live packet sniffer with application-protocol heuristics")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List capture devices in selection-priority order
    Devices,

    /// Capture live traffic and print one line per dissected packet
    Capture {
        /// Interface name (default: first device in priority order)
        #[arg(short, long)]
        interface: Option<String>,

        /// BPF filter expression
        #[arg(short, long)]
        filter: Option<String>,

        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many seconds (default: run until interrupted)
        #[arg(long)]
        duration: Option<u64>,

        /// Print a hex/ASCII dump of every packet
        #[arg(long)]
        hex: bool,
    },
}

pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Devices => cmd_devices(),
        Commands::Capture {
            interface,
            filter,
            config,
            duration,
            hex,
        } => cmd_capture(interface, filter, config, duration, hex),
    }
}

fn cmd_devices() -> Result<()> {
    let devices = list_devices()?;
    if devices.is_empty() {
        bail!("no capture devices found");
    }
    for device in devices {
        match &device.desc {
            Some(desc) => println!("{:<16} {}", device.name, desc),
            None => println!("{}", device.name),
        }
    }
    Ok(())
}

fn cmd_capture(
    interface: Option<String>,
    filter: Option<String>,
    config_path: Option<PathBuf>,
    duration: Option<u64>,
    hex: bool,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => CaptureConfig::load(path)?,
        None => CaptureConfig::default(),
    };
    // Command-line flags win over the file.
    if interface.is_some() {
        config.interface = interface;
    }
    if filter.is_some() {
        config.filter = filter;
    }

    let device = match &config.interface {
        Some(name) => packetscope::find_device(name)?,
        None => list_devices()?
            .into_iter()
            .next()
            .context("no capture devices found")?,
    };

    match duration {
        Some(secs) => println!("Capturing on {} for {}s", device.name, secs),
        None => println!("Capturing on {}", device.name),
    }

    let mut session = CaptureSession::new();
    session.start(device, &config, move |packet| {
        print_packet(&packet, hex);
    })?;

    match duration {
        Some(secs) => {
            thread::sleep(Duration::from_secs(secs));
            session.stop();
        }
        None => {
            while !session.is_stopped() {
                thread::sleep(Duration::from_millis(200));
            }
        }
    }

    Ok(())
}

fn print_packet(packet: &CapturedPacket, hex: bool) {
    let endpoints = match (packet.layers.src_port(), packet.layers.dst_port()) {
        (Some(sp), Some(dp)) => format!(
            "{}:{} -> {}:{}",
            packet.source, sp, packet.destination, dp
        ),
        _ => format!("{} -> {}", packet.source, packet.destination),
    };

    let detail = match (&packet.application, &packet.layers.arp) {
        (Some(app), _) => format!("  [{}] {}", app.protocol, app.summary()),
        (None, Some(arp)) => {
            let op = match (arp.is_request(), arp.is_reply()) {
                (true, _) => "request".to_string(),
                (_, true) => "reply".to_string(),
                _ => format!("op {}", arp.operation),
            };
            format!("  [{} from {}]", op, format_mac(&arp.sender_hw))
        }
        _ => String::new(),
    };

    println!(
        "#{:<6} {:>8}ms  {:<5} {}  {} bytes{}",
        packet.id, packet.timestamp_ms, packet.protocol, endpoints, packet.length, detail
    );

    if hex {
        print!("{}", packet.dump());
    }
}
