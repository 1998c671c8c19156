//! HID device access over libusb
//!
//! `usbhid` finds HID interfaces on attached USB devices, opens them and
//! moves reports in both directions. Input reports are drained from the
//! interrupt-IN endpoint by a background thread into a bounded queue, so a
//! slow reader loses the oldest reports rather than stalling the device.
//!
//! # Example
//!
//! ```no_run
//! use usbhid::HidApi;
//!
//! let api = HidApi::new()?;
//! for info in api.enumerate(0, 0)? {
//!     println!("{} {:04x}:{:04x}", info.path, info.vendor_id, info.product_id);
//! }
//!
//! let device = api.open(0x046d, 0xc52b, None)?;
//! let mut buf = [0u8; 64];
//! let len = device.read_timeout(&mut buf, 1000)?;
//! println!("{:02x?}", &buf[..len]);
//! # Ok::<(), usbhid::HidError>(())
//! ```

pub mod api;
pub mod claim;
pub mod config;
pub mod device;
mod enumerate;
pub mod error;
pub mod identity;
pub mod mock;
pub mod pipeline;
pub mod quirks;
pub mod rusb_backend;
pub mod transport;

pub use api::HidApi;
pub use config::{HidConfig, StringSettings, UsbSettings, load_config};
pub use device::HidDevice;
pub use error::{HidError, HidResult};
pub use hid_protocol::{BusType, DeviceInfo};
pub use identity::WideChar;
pub use rusb_backend::RusbBackend;
pub use transport::{UsbBackend, UsbDevice, UsbHandle};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
