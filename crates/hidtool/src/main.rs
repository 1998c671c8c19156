//! hidtool
//!
//! Lists USB HID devices and exchanges reports with them.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::DeviceArgs;
use hid_common::setup_logging;
use std::path::PathBuf;
use tracing::info;
use usbhid::{HidApi, HidConfig};

#[derive(Parser, Debug)]
#[command(name = "hidtool")]
#[command(author, version, about = "List and talk to USB HID devices")]
#[command(long_about = "
Enumerates HID interfaces on attached USB devices and reads or writes their
reports through libusb.

EXAMPLES:
    # List every HID interface
    hidtool list

    # List one vendor's devices as JSON
    hidtool list --vid 046d --json

    # Print ten input reports
    hidtool read --id 046d:c52b --count 10

    # Send output report 0 to a device by path
    hidtool write --path 1-4.2:1.0 00 01 ff

    # Fetch feature report 3 (up to 64 bytes)
    hidtool feature get --id 054c:0268 --report-id 3 --length 64

CONFIGURATION:
    Settings are read from ~/.config/usbhid/config.toml unless --config is
    given. RUST_LOG overrides the configured log level.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List HID interfaces
    List {
        /// Only devices with this vendor id (hex)
        #[arg(long, value_name = "VID")]
        vid: Option<String>,

        /// Only devices with this product id (hex)
        #[arg(long, value_name = "PID")]
        pid: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Read each interface's report descriptor to fill in usage
        /// (claims interfaces briefly)
        #[arg(long)]
        usage: bool,
    },

    /// Print input reports as they arrive
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Stop after this many reports (0 = forever)
        #[arg(short = 'n', long, default_value_t = 0)]
        count: usize,

        /// Per-report timeout in milliseconds (-1 = wait forever)
        #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
        timeout: i32,

        /// Largest report to accept
        #[arg(long, default_value_t = 64)]
        length: usize,
    },

    /// Send an output report; the first byte is the report id
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Report bytes in hex
        #[arg(required = true, value_name = "BYTE")]
        data: Vec<String>,
    },

    /// Get or send feature reports
    Feature {
        #[command(subcommand)]
        action: FeatureAction,
    },

    /// Fetch an input report over the control pipe
    InputReport {
        #[command(flatten)]
        device: DeviceArgs,

        /// Report id (0 if the device uses none)
        #[arg(long, default_value = "0")]
        report_id: String,

        /// Buffer size including the report id byte
        #[arg(long, default_value_t = 64)]
        length: usize,
    },

    /// Dump the report descriptor
    Descriptor {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show strings and identification of an open device
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(Subcommand, Debug)]
enum FeatureAction {
    /// Fetch a feature report
    Get {
        #[command(flatten)]
        device: DeviceArgs,

        /// Report id (0 if the device uses none)
        #[arg(long, default_value = "0")]
        report_id: String,

        /// Buffer size including the report id byte
        #[arg(long, default_value_t = 64)]
        length: usize,
    },

    /// Send a feature report; the first byte is the report id
    Send {
        #[command(flatten)]
        device: DeviceArgs,

        /// Report bytes in hex
        #[arg(required = true, value_name = "BYTE")]
        data: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = HidConfig::default();
        let path = HidConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        HidConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        HidConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level).to_string();
    setup_logging(&log_level).context("Failed to setup logging")?;

    info!("hidtool v{} (usbhid v{})", env!("CARGO_PKG_VERSION"), usbhid::VERSION);

    if let Some(Command::List { usage: true, .. }) = args.command {
        config.usb.invasive_usage = true;
    }

    let api = HidApi::with_config(config).context("Failed to initialize libusb")?;

    match args.command.unwrap_or(Command::List {
        vid: None,
        pid: None,
        json: false,
        usage: false,
    }) {
        Command::List { vid, pid, json, .. } => {
            commands::list(&api, vid.as_deref(), pid.as_deref(), json)
        }
        Command::Read {
            device,
            count,
            timeout,
            length,
        } => commands::read(&api, &device, count, timeout, length),
        Command::Write { device, data } => commands::write(&api, &device, &data),
        Command::Feature { action } => match action {
            FeatureAction::Get {
                device,
                report_id,
                length,
            } => commands::get_feature(&api, &device, &report_id, length),
            FeatureAction::Send { device, data } => commands::send_feature(&api, &device, &data),
        },
        Command::InputReport {
            device,
            report_id,
            length,
        } => commands::get_input(&api, &device, &report_id, length),
        Command::Descriptor { device } => commands::descriptor(&api, &device),
        Command::Info { device } => commands::info(&api, &device),
    }
}
