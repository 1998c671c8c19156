//! Test utilities for usbhid
//!
//! Provides descriptor builders, canned records and timing helpers for
//! testing across crates.
//!
//! # Example
//!
//! ```
//! use hid_common::test_utils::{create_mock_device_info, encode_string_descriptor};
//!
//! let device = create_mock_device_info("1-2:1.0", 0x1234, 0x5678);
//! assert_eq!(device.vendor_id, 0x1234);
//!
//! let desc = encode_string_descriptor("Hi");
//! assert_eq!(desc, vec![6, 0x03, b'H', 0, b'i', 0]);
//! ```

use hid_protocol::{BusType, DeviceInfo, types::CLASS_HID};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a mock DeviceInfo for a HID interface
///
/// # Arguments
/// * `path` - Device path string
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
pub fn create_mock_device_info(path: &str, vendor_id: u16, product_id: u16) -> DeviceInfo {
    DeviceInfo {
        path: path.to_string(),
        vendor_id,
        product_id,
        serial_number: Some("SN000001".to_string()),
        release_number: 0x0100,
        manufacturer_string: Some("Test Manufacturer".to_string()),
        product_string: Some("Test Product".to_string()),
        usage_page: 0,
        usage: 0,
        interface_number: 0,
        interface_class: CLASS_HID,
        interface_subclass: 0,
        interface_protocol: 0,
        bus_type: BusType::Usb,
    }
}

/// Run a blocking operation on a helper thread, giving up after `duration`
///
/// The helper thread is left running if the operation never returns, so a
/// hung test fails instead of hanging the whole suite.
///
/// # Example
/// ```
/// use hid_common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// let value = with_timeout(DEFAULT_TEST_TIMEOUT, || 42).unwrap();
/// assert_eq!(value, 42);
/// ```
pub fn with_timeout<T, F>(duration: Duration, op: F) -> Result<T, TimeoutError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(op());
    });
    rx.recv_timeout(duration)
        .map_err(|_| TimeoutError { duration })
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// Error returned when a test times out
#[derive(Debug)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Test timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

/// Create a mock report descriptor for a boot mouse
pub fn create_mock_report_descriptor() -> Vec<u8> {
    vec![
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x02, // Usage (Mouse)
        0xa1, 0x01, // Collection (Application)
        0x09, 0x01, //   Usage (Pointer)
        0xa1, 0x00, //   Collection (Physical)
        0x05, 0x09, //     Usage Page (Button)
        0x19, 0x01, //     Usage Minimum (1)
        0x29, 0x03, //     Usage Maximum (3)
        0x15, 0x00, //     Logical Minimum (0)
        0x25, 0x01, //     Logical Maximum (1)
        0x95, 0x03, //     Report Count (3)
        0x75, 0x01, //     Report Size (1)
        0x81, 0x02, //     Input (Data, Variable, Absolute)
        0xc0, //   End Collection
        0xc0, // End Collection
    ]
}

/// Create a HID class descriptor announcing a report descriptor of `report_len` bytes
pub fn create_mock_hid_descriptor(report_len: u16) -> Vec<u8> {
    let [lo, hi] = report_len.to_le_bytes();
    vec![
        0x09, // bLength
        0x21, // bDescriptorType (HID)
        0x11, 0x01, // bcdHID (1.11)
        0x00, // bCountryCode
        0x01, // bNumDescriptors
        0x22, // bDescriptorType (Report)
        lo, hi, // wDescriptorLength
    ]
}

/// Encode `text` as a USB string descriptor (UTF-16LE with a 2-byte header)
pub fn encode_string_descriptor(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut desc = Vec::with_capacity(2 + units.len() * 2);
    desc.push((2 + units.len() * 2).min(255) as u8);
    desc.push(0x03);
    for unit in units {
        desc.extend_from_slice(&unit.to_le_bytes());
    }
    desc
}

/// Encode string descriptor 0 listing the supported LANGIDs
pub fn encode_language_ids(langs: &[u16]) -> Vec<u8> {
    let mut desc = vec![(2 + langs.len() * 2).min(255) as u8, 0x03];
    for lang in langs {
        desc.extend_from_slice(&lang.to_le_bytes());
    }
    desc
}
