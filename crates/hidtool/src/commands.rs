//! Subcommand implementations

use anyhow::{Context, Result, anyhow, bail};
use hid_protocol::{DeviceInfo, DevicePath, parse_hex_id};
use std::time::Instant;
use tracing::debug;
use usbhid::{HidApi, HidDevice};

/// Which device to open
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device path as printed by `list` (e.g. 1-4.2:1.0)
    #[arg(long, conflicts_with = "id", required_unless_present = "id")]
    pub path: Option<String>,

    /// Vendor and product id in hex
    #[arg(long, value_name = "VID:PID")]
    pub id: Option<String>,

    /// Serial number to pick among devices with the same id
    #[arg(long, requires = "id")]
    pub serial: Option<String>,
}

/// Parse "VID:PID" in hex
pub fn parse_id_pair(value: &str) -> Result<(u16, u16)> {
    let (vid, pid) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("Expected VID:PID, got '{}'", value))?;
    Ok((parse_hex_id(vid, "vendor id")?, parse_hex_id(pid, "product id")?))
}

/// Parse one byte written in hex, with or without `0x`
pub fn parse_byte(value: &str) -> Result<u8> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() || digits.len() > 2 {
        bail!("Invalid byte '{}'", value);
    }
    u8::from_str_radix(digits, 16).with_context(|| format!("Invalid byte '{}'", value))
}

pub fn parse_bytes(values: &[String]) -> Result<Vec<u8>> {
    values.iter().map(|v| parse_byte(v)).collect()
}

/// Space-separated hex dump
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn open(api: &HidApi, args: &DeviceArgs) -> Result<HidDevice> {
    if let Some(path) = &args.path {
        let parsed: DevicePath = path.parse()?;
        debug!("Opening by path {}", parsed);
        return api
            .open_path(path)
            .with_context(|| format!("Failed to open {}", path));
    }

    let id = args
        .id
        .as_deref()
        .ok_or_else(|| anyhow!("Either --path or --id is required"))?;
    let (vid, pid) = parse_id_pair(id)?;
    api.open(vid, pid, args.serial.as_deref())
        .with_context(|| format!("Failed to open {:04x}:{:04x}", vid, pid))
}

/// One table row per interface
pub fn render_table(devices: &[DeviceInfo]) -> String {
    let mut out = format!(
        "{:<24} {:<9} {:<5} {:<11} {:<24} {}\n",
        "PATH", "ID", "IFACE", "USAGE", "MANUFACTURER", "PRODUCT"
    );
    for info in devices {
        out.push_str(&format!(
            "{:<24} {:04x}:{:04x} {:<5} {:04x}:{:04x}  {:<24} {}\n",
            info.path,
            info.vendor_id,
            info.product_id,
            info.interface_number,
            info.usage_page,
            info.usage,
            info.manufacturer_string.as_deref().unwrap_or("-"),
            info.product_string.as_deref().unwrap_or("-"),
        ));
    }
    out
}

pub fn list(api: &HidApi, vid: Option<&str>, pid: Option<&str>, json: bool) -> Result<()> {
    let vid = vid.map(|v| parse_hex_id(v, "vendor id")).transpose()?.unwrap_or(0);
    let pid = pid.map(|p| parse_hex_id(p, "product id")).transpose()?.unwrap_or(0);

    let devices = api.enumerate(vid, pid).context("Enumeration failed")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No HID devices found");
    } else {
        print!("{}", render_table(&devices));
    }
    Ok(())
}

pub fn read(api: &HidApi, args: &DeviceArgs, count: usize, timeout: i32, length: usize) -> Result<()> {
    let device = open(api, args)?;
    let mut buf = vec![0u8; length.max(1)];
    let start = Instant::now();
    let mut received = 0;

    while count == 0 || received < count {
        let len = device.read_timeout(&mut buf, timeout)?;
        if len == 0 {
            println!("(timeout)");
            continue;
        }
        received += 1;
        println!("{:>10.3} {}", start.elapsed().as_secs_f64(), hex(&buf[..len]));
    }

    let dropped = device.dropped_reports();
    if dropped > 0 {
        eprintln!("{} report(s) dropped while the queue was full", dropped);
    }
    Ok(())
}

pub fn write(api: &HidApi, args: &DeviceArgs, data: &[String]) -> Result<()> {
    let report = parse_bytes(data)?;
    let device = open(api, args)?;
    let written = device.write(&report).context("Write failed")?;
    println!("Wrote {} byte(s)", written);
    Ok(())
}

pub fn send_feature(api: &HidApi, args: &DeviceArgs, data: &[String]) -> Result<()> {
    let report = parse_bytes(data)?;
    let device = open(api, args)?;
    let sent = device
        .send_feature_report(&report)
        .context("Sending feature report failed")?;
    println!("Sent {} byte(s)", sent);
    Ok(())
}

pub fn get_feature(api: &HidApi, args: &DeviceArgs, report_id: &str, length: usize) -> Result<()> {
    let device = open(api, args)?;
    let mut buf = vec![0u8; length.max(1)];
    buf[0] = parse_byte(report_id)?;
    let len = device
        .get_feature_report(&mut buf)
        .context("Fetching feature report failed")?;
    println!("{}", hex(&buf[..len]));
    Ok(())
}

pub fn get_input(api: &HidApi, args: &DeviceArgs, report_id: &str, length: usize) -> Result<()> {
    let device = open(api, args)?;
    let mut buf = vec![0u8; length.max(1)];
    buf[0] = parse_byte(report_id)?;
    let len = device
        .get_input_report(&mut buf)
        .context("Fetching input report failed")?;
    println!("{}", hex(&buf[..len]));
    Ok(())
}

pub fn descriptor(api: &HidApi, args: &DeviceArgs) -> Result<()> {
    let device = open(api, args)?;
    let mut buf = vec![0u8; 4096];
    let len = device
        .get_report_descriptor(&mut buf)
        .context("Reading report descriptor failed")?;

    for chunk in buf[..len].chunks(16) {
        println!("{}", hex(chunk));
    }
    Ok(())
}

pub fn info(api: &HidApi, args: &DeviceArgs) -> Result<()> {
    let device = open(api, args)?;
    println!("{}", serde_json::to_string_pretty(device.get_device_info())?);
    Ok(())
}
