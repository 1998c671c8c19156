//! USB transport abstraction
//!
//! The HID engine talks to USB only through these traits. [`crate::rusb_backend`]
//! implements them on top of libusb; [`crate::mock`] implements them in
//! memory for tests. Descriptors cross the boundary as owned
//! [`hid_protocol::types`] values.

use hid_protocol::{ConfigDescriptor, UsbDeviceDescriptor};
use std::time::Duration;

/// Result type used at the transport boundary
pub type UsbResult<T> = std::result::Result<T, rusb::Error>;

/// Source of USB devices (a libusb context)
pub trait UsbBackend: Send + Sync {
    /// Snapshot of the devices currently attached
    fn devices(&self) -> UsbResult<Vec<Box<dyn UsbDevice>>>;

    /// Wrap an already opened platform handle (a file descriptor on Unix)
    fn wrap_sys_device(&self, sys_dev: isize) -> UsbResult<Box<dyn UsbHandle>>;
}

/// An attached, not necessarily opened, USB device
pub trait UsbDevice: Send + Sync {
    fn bus_number(&self) -> u8;

    /// Port chain from the root hub, outermost first
    fn port_numbers(&self) -> UsbResult<Vec<u8>>;

    fn device_descriptor(&self) -> UsbResult<UsbDeviceDescriptor>;

    fn active_config_descriptor(&self) -> UsbResult<ConfigDescriptor>;

    /// Configuration by index (not by bConfigurationValue)
    fn config_descriptor(&self, index: u8) -> UsbResult<ConfigDescriptor>;

    fn open(&self) -> UsbResult<Box<dyn UsbHandle>>;
}

/// An opened USB device
///
/// Transfers take `&self` so a background reader and callers can share one
/// handle; interface management needs exclusive access.
pub trait UsbHandle: Send + Sync {
    /// The device this handle was opened from
    fn device(&self) -> Box<dyn UsbDevice>;

    fn kernel_driver_active(&self, interface: u8) -> UsbResult<bool>;

    fn detach_kernel_driver(&mut self, interface: u8) -> UsbResult<()>;

    fn attach_kernel_driver(&mut self, interface: u8) -> UsbResult<()>;

    fn claim_interface(&mut self, interface: u8) -> UsbResult<()>;

    fn release_interface(&mut self, interface: u8) -> UsbResult<()>;

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> UsbResult<()>;

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> UsbResult<usize>;

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> UsbResult<usize>;

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> UsbResult<usize>;

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> UsbResult<usize>;
}

/// Errors after which the read pipeline cannot make progress
pub fn is_fatal(err: rusb::Error) -> bool {
    matches!(
        err,
        rusb::Error::NoDevice
            | rusb::Error::NotFound
            | rusb::Error::Access
            | rusb::Error::InvalidParam
            | rusb::Error::NotSupported
            | rusb::Error::NoMem
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(is_fatal(rusb::Error::NoDevice));
        assert!(is_fatal(rusb::Error::Access));
        assert!(!is_fatal(rusb::Error::Timeout));
        assert!(!is_fatal(rusb::Error::Busy));
        assert!(!is_fatal(rusb::Error::Overflow));
        assert!(!is_fatal(rusb::Error::Interrupted));
        assert!(!is_fatal(rusb::Error::Pipe));
    }
}
