//! libusb backend
//!
//! Implements the transport traits with `rusb`, converting rusb descriptors
//! into owned protocol types.

use crate::transport::{UsbBackend, UsbDevice, UsbHandle, UsbResult};
use hid_protocol::{
    ConfigDescriptor, EndpointDescriptor, Interface, InterfaceDescriptor, TransferKind,
    UsbDeviceDescriptor,
};
use rusb::{Context, Device, DeviceHandle, UsbContext};
use std::time::Duration;
use tracing::debug;

/// Backend over a libusb context
pub struct RusbBackend {
    context: Context,
}

impl RusbBackend {
    /// Initialize a new libusb context
    pub fn new() -> UsbResult<Self> {
        let context = Context::new()?;
        debug!("Initialized libusb context");
        Ok(Self { context })
    }
}

impl UsbBackend for RusbBackend {
    fn devices(&self) -> UsbResult<Vec<Box<dyn UsbDevice>>> {
        let list = self.context.devices()?;
        Ok(list
            .iter()
            .map(|device| Box::new(RusbDevice { device }) as Box<dyn UsbDevice>)
            .collect())
    }

    #[cfg(unix)]
    fn wrap_sys_device(&self, sys_dev: isize) -> UsbResult<Box<dyn UsbHandle>> {
        let fd = i32::try_from(sys_dev).map_err(|_| rusb::Error::InvalidParam)?;
        // SAFETY: the caller hands over an open usbfs file descriptor and
        // keeps it open for the lifetime of the returned handle.
        let handle = unsafe { self.context.open_device_with_fd(fd)? };
        Ok(Box::new(RusbHandle { handle }))
    }

    #[cfg(not(unix))]
    fn wrap_sys_device(&self, _sys_dev: isize) -> UsbResult<Box<dyn UsbHandle>> {
        Err(rusb::Error::NotSupported)
    }
}

struct RusbDevice {
    device: Device<Context>,
}

impl UsbDevice for RusbDevice {
    fn bus_number(&self) -> u8 {
        self.device.bus_number()
    }

    fn port_numbers(&self) -> UsbResult<Vec<u8>> {
        self.device.port_numbers()
    }

    fn device_descriptor(&self) -> UsbResult<UsbDeviceDescriptor> {
        let desc = self.device.device_descriptor()?;
        Ok(UsbDeviceDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
            release_number: version_to_bcd(desc.device_version()),
            manufacturer_index: desc.manufacturer_string_index(),
            product_index: desc.product_string_index(),
            serial_number_index: desc.serial_number_string_index(),
        })
    }

    fn active_config_descriptor(&self) -> UsbResult<ConfigDescriptor> {
        Ok(map_config(&self.device.active_config_descriptor()?))
    }

    fn config_descriptor(&self, index: u8) -> UsbResult<ConfigDescriptor> {
        Ok(map_config(&self.device.config_descriptor(index)?))
    }

    fn open(&self) -> UsbResult<Box<dyn UsbHandle>> {
        let handle = self.device.open()?;
        Ok(Box::new(RusbHandle { handle }))
    }
}

struct RusbHandle {
    handle: DeviceHandle<Context>,
}

impl UsbHandle for RusbHandle {
    fn device(&self) -> Box<dyn UsbDevice> {
        Box::new(RusbDevice {
            device: self.handle.device(),
        })
    }

    fn kernel_driver_active(&self, interface: u8) -> UsbResult<bool> {
        self.handle.kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> UsbResult<()> {
        self.handle.detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> UsbResult<()> {
        self.handle.attach_kernel_driver(interface)
    }

    fn claim_interface(&mut self, interface: u8) -> UsbResult<()> {
        self.handle.claim_interface(interface)
    }

    fn release_interface(&mut self, interface: u8) -> UsbResult<()> {
        self.handle.release_interface(interface)
    }

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> UsbResult<()> {
        self.handle.set_alternate_setting(interface, setting)
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> UsbResult<usize> {
        self.handle
            .read_control(request_type, request, value, index, buf, timeout)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> UsbResult<usize> {
        self.handle
            .write_control(request_type, request, value, index, buf, timeout)
    }

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> UsbResult<usize> {
        self.handle.read_interrupt(endpoint, buf, timeout)
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], timeout: Duration) -> UsbResult<usize> {
        self.handle.write_interrupt(endpoint, buf, timeout)
    }
}

/// Re-pack rusb's decoded bcdDevice into its BCD form
fn version_to_bcd(version: rusb::Version) -> u16 {
    let major = version.major() as u16;
    ((major / 10) << 12)
        | ((major % 10) << 8)
        | ((version.minor() as u16 & 0xf) << 4)
        | (version.sub_minor() as u16 & 0xf)
}

fn map_transfer_type(kind: rusb::TransferType) -> TransferKind {
    match kind {
        rusb::TransferType::Control => TransferKind::Control,
        rusb::TransferType::Isochronous => TransferKind::Isochronous,
        rusb::TransferType::Bulk => TransferKind::Bulk,
        rusb::TransferType::Interrupt => TransferKind::Interrupt,
    }
}

fn map_config(config: &rusb::ConfigDescriptor) -> ConfigDescriptor {
    ConfigDescriptor {
        number: config.number(),
        interfaces: config
            .interfaces()
            .map(|interface| Interface {
                number: interface.number(),
                alt_settings: interface
                    .descriptors()
                    .map(|alt| InterfaceDescriptor {
                        interface_number: alt.interface_number(),
                        alternate_setting: alt.setting_number(),
                        class_code: alt.class_code(),
                        sub_class_code: alt.sub_class_code(),
                        protocol_code: alt.protocol_code(),
                        endpoints: alt
                            .endpoint_descriptors()
                            .map(|ep| EndpointDescriptor {
                                address: ep.address(),
                                kind: map_transfer_type(ep.transfer_type()),
                                max_packet_size: ep.max_packet_size(),
                            })
                            .collect(),
                        extra: alt.extra().to_vec(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_to_bcd() {
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x0100)), 0x0100);
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x1234)), 0x1234);
        assert_eq!(version_to_bcd(rusb::Version::from_bcd(0x0572)), 0x0572);
    }

    #[test]
    fn test_map_transfer_type() {
        assert_eq!(
            map_transfer_type(rusb::TransferType::Interrupt),
            TransferKind::Interrupt
        );
        assert_eq!(map_transfer_type(rusb::TransferType::Bulk), TransferKind::Bulk);
    }
}
