//! HID protocol definitions for usbhid
//!
//! This crate holds everything about USB HID that can be expressed without
//! talking to hardware: the descriptor model, report descriptor scanning,
//! device path strings, device quirk tables and the locale to LANGID table.
//!
//! # Example
//!
//! ```
//! use hid_protocol::{find_first_usage, format_path};
//!
//! let descriptor = [0x05, 0x01, 0x09, 0x06, 0xa1, 0x01, 0xc0];
//! let usage = find_first_usage(&descriptor).complete().unwrap();
//! assert_eq!((usage.usage_page, usage.usage), (0x01, 0x06));
//!
//! assert_eq!(format_path(1, &[2, 3], 1, 0), "1-2.3:1.0");
//! ```

pub mod error;
pub mod language;
pub mod path;
pub mod quirks;
pub mod report_descriptor;
pub mod types;

pub use error::{ProtocolError, Result, parse_hex_id};
pub use language::{LANG_EN_US, usb_lang_for_locale};
pub use path::{DevicePath, MAX_PATH_LEN, format_path};
pub use quirks::QuirkFlags;
pub use report_descriptor::{Usage, UsageScan, find_first_usage, report_descriptor_length};
pub use types::{
    BusType, ConfigDescriptor, DeviceInfo, EndpointDescriptor, Interface, InterfaceDescriptor,
    ReportType, TransferKind, UsbDeviceDescriptor,
};
