//! USB and HID type definitions
//!
//! This module defines the descriptor model shared by the transport layer and
//! the HID engine, plus the enumeration record handed to applications.
//! Everything here is plain data: owned copies of what the USB stack reports,
//! so the HID logic can be exercised without real hardware.

use serde::{Deserialize, Serialize};

/// USB interface class code for HID
pub const CLASS_HID: u8 = 0x03;

/// USB interface class code for vendor-specific interfaces
pub const CLASS_VENDOR_SPEC: u8 = 0xff;

/// Descriptor type: string
pub const DT_STRING: u8 = 0x03;

/// Descriptor type: HID class descriptor
pub const DT_HID: u8 = 0x21;

/// Descriptor type: HID report descriptor
pub const DT_REPORT: u8 = 0x22;

/// Standard request: GET_DESCRIPTOR
pub const REQUEST_GET_DESCRIPTOR: u8 = 0x06;

/// HID class request: GET_REPORT
pub const HID_GET_REPORT: u8 = 0x01;

/// HID class request: SET_REPORT
pub const HID_SET_REPORT: u8 = 0x09;

/// Upper bound for a report descriptor fetch
pub const MAX_REPORT_DESCRIPTOR_SIZE: u16 = 4096;

/// bmRequestType values used by the HID engine.
///
/// Bit 7 is the direction (1 = IN), bits 5..6 the type, bits 0..4 the recipient.
pub mod request_type {
    /// Standard request, device recipient, device-to-host
    pub const STANDARD_DEVICE_IN: u8 = 0x80;
    /// Standard request, interface recipient, device-to-host
    pub const STANDARD_INTERFACE_IN: u8 = 0x81;
    /// Class request, interface recipient, host-to-device
    pub const CLASS_INTERFACE_OUT: u8 = 0x21;
    /// Class request, interface recipient, device-to-host
    pub const CLASS_INTERFACE_IN: u8 = 0xa1;
    /// Vendor request, interface recipient, device-to-host
    pub const VENDOR_INTERFACE_IN: u8 = 0xc1;
}

/// HID report type, carried in the high byte of wValue for GET/SET_REPORT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReportType {
    /// Device-to-host data report
    Input = 1,
    /// Host-to-device data report
    Output = 2,
    /// Bidirectional configuration report
    Feature = 3,
}

impl ReportType {
    /// wValue for a GET/SET_REPORT request targeting `report_id`
    pub fn w_value(self, report_id: u8) -> u16 {
        ((self as u16) << 8) | report_id as u16
    }
}

/// Bus a HID device is attached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BusType {
    /// Bus could not be determined
    Unknown,
    /// Universal Serial Bus
    #[default]
    Usb,
    /// Bluetooth (classic)
    Bluetooth,
    /// I2C
    I2c,
    /// SPI
    Spi,
}

/// Endpoint transfer type (bmAttributes bits 0..1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Device descriptor fields the HID engine needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbDeviceDescriptor {
    /// USB Vendor ID (idVendor)
    pub vendor_id: u16,
    /// USB Product ID (idProduct)
    pub product_id: u16,
    /// Device release number in BCD (bcdDevice)
    pub release_number: u16,
    /// Manufacturer string index (iManufacturer), None if zero
    pub manufacturer_index: Option<u8>,
    /// Product string index (iProduct), None if zero
    pub product_index: Option<u8>,
    /// Serial number string index (iSerialNumber), None if zero
    pub serial_number_index: Option<u8>,
}

/// Endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Endpoint address including the direction bit
    pub address: u8,
    /// Transfer type
    pub kind: TransferKind,
    /// wMaxPacketSize
    pub max_packet_size: u16,
}

impl EndpointDescriptor {
    /// Whether data flows device-to-host on this endpoint
    pub fn is_in(&self) -> bool {
        self.address & 0x80 != 0
    }

    /// Whether this is an interrupt endpoint
    pub fn is_interrupt(&self) -> bool {
        self.kind == TransferKind::Interrupt
    }
}

/// One alternate setting of an interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    /// bInterfaceNumber
    pub interface_number: u8,
    /// bAlternateSetting
    pub alternate_setting: u8,
    /// bInterfaceClass
    pub class_code: u8,
    /// bInterfaceSubClass
    pub sub_class_code: u8,
    /// bInterfaceProtocol
    pub protocol_code: u8,
    /// Endpoints of this alternate setting
    pub endpoints: Vec<EndpointDescriptor>,
    /// Class-specific descriptors following the interface descriptor
    pub extra: Vec<u8>,
}

impl InterfaceDescriptor {
    /// First interrupt IN endpoint
    pub fn interrupt_in(&self) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|ep| ep.is_interrupt() && ep.is_in())
    }

    /// First interrupt OUT endpoint
    pub fn interrupt_out(&self) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|ep| ep.is_interrupt() && !ep.is_in())
    }
}

/// An interface and all of its alternate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Interface number
    pub number: u8,
    /// Alternate settings in descriptor order
    pub alt_settings: Vec<InterfaceDescriptor>,
}

/// Configuration descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    /// bConfigurationValue
    pub number: u8,
    /// Interfaces in descriptor order
    pub interfaces: Vec<Interface>,
}

impl ConfigDescriptor {
    /// Iterate every alternate setting of every interface, in descriptor order
    pub fn alt_settings(&self) -> impl Iterator<Item = &InterfaceDescriptor> {
        self.interfaces.iter().flat_map(|i| i.alt_settings.iter())
    }
}

/// HID device information returned by enumeration
///
/// One record per HID-eligible interface. Usage fields are zero unless the
/// usage probe ran (see the `invasive_usage` setting) or the record came
/// from an open device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Platform path, `bus-port[.port...]:config.interface`
    pub path: String,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Serial number string (if available)
    pub serial_number: Option<String>,
    /// Device release number in BCD
    pub release_number: u16,
    /// Manufacturer string (if available)
    pub manufacturer_string: Option<String>,
    /// Product string (if available)
    pub product_string: Option<String>,
    /// Usage Page from the report descriptor (0 if unknown)
    pub usage_page: u16,
    /// Usage from the report descriptor (0 if unknown)
    pub usage: u16,
    /// USB interface number
    pub interface_number: u8,
    /// USB interface class
    pub interface_class: u8,
    /// USB interface subclass
    pub interface_subclass: u8,
    /// USB interface protocol
    pub interface_protocol: u8,
    /// Underlying bus
    pub bus_type: BusType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(address: u8, kind: TransferKind) -> EndpointDescriptor {
        EndpointDescriptor {
            address,
            kind,
            max_packet_size: 64,
        }
    }

    #[test]
    fn test_report_type_w_value() {
        assert_eq!(ReportType::Output.w_value(0), 0x0200);
        assert_eq!(ReportType::Feature.w_value(0x05), 0x0305);
        assert_eq!(ReportType::Input.w_value(0xff), 0x01ff);
    }

    #[test]
    fn test_interrupt_endpoint_selection() {
        let iface = InterfaceDescriptor {
            interface_number: 0,
            alternate_setting: 0,
            class_code: CLASS_HID,
            sub_class_code: 0,
            protocol_code: 0,
            endpoints: vec![
                ep(0x82, TransferKind::Bulk),
                ep(0x81, TransferKind::Interrupt),
                ep(0x83, TransferKind::Interrupt),
                ep(0x02, TransferKind::Interrupt),
            ],
            extra: Vec::new(),
        };

        assert_eq!(iface.interrupt_in().map(|e| e.address), Some(0x81));
        assert_eq!(iface.interrupt_out().map(|e| e.address), Some(0x02));
    }

    #[test]
    fn test_missing_output_endpoint() {
        let iface = InterfaceDescriptor {
            interface_number: 1,
            alternate_setting: 0,
            class_code: CLASS_HID,
            sub_class_code: 0,
            protocol_code: 0,
            endpoints: vec![ep(0x81, TransferKind::Interrupt)],
            extra: Vec::new(),
        };
        assert!(iface.interrupt_out().is_none());
    }

    #[test]
    fn test_device_info_serde() {
        let info = DeviceInfo {
            path: "1-2:1.0".to_string(),
            vendor_id: 0x046d,
            product_id: 0xc52b,
            serial_number: None,
            release_number: 0x1201,
            manufacturer_string: Some("Logitech".to_string()),
            product_string: Some("USB Receiver".to_string()),
            usage_page: 0,
            usage: 0,
            interface_number: 0,
            interface_class: CLASS_HID,
            interface_subclass: 1,
            interface_protocol: 1,
            bus_type: BusType::Usb,
        };

        let json = serde_json::to_string(&info).unwrap();
        let parsed: DeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, info);
    }
}
