//! HID device discovery
//!
//! Walks every attached USB device and produces one [`DeviceInfo`] per
//! interface that HID access applies to. Records come back in discovery
//! order; nothing is sorted or deduplicated.

use crate::api::Shared;
use crate::claim::ClaimedInterface;
use crate::device::read_report_descriptor;
use crate::error::HidResult;
use crate::identity::{read_optional_string, resolve_path};
use crate::transport::{UsbDevice, UsbHandle};
use hid_protocol::quirks::{is_denylisted, should_enumerate};
use hid_protocol::{
    BusType, ConfigDescriptor, DeviceInfo, InterfaceDescriptor, Usage, UsbDeviceDescriptor,
    find_first_usage, report_descriptor_length,
};
use tracing::{debug, trace};

/// The configuration to inspect: the active one, else the first
pub(crate) fn device_config(device: &dyn UsbDevice) -> Option<ConfigDescriptor> {
    match device.active_config_descriptor() {
        Ok(config) => Some(config),
        Err(e) => {
            trace!("No active configuration ({}), trying index 0", e);
            device
                .config_descriptor(0)
                .map_err(|e| debug!("Could not read configuration 0: {}", e))
                .ok()
        }
    }
}

/// First qualifying alternate setting of each interface, in descriptor order
pub(crate) fn hid_interfaces(
    vendor_id: u16,
    config: &ConfigDescriptor,
) -> impl Iterator<Item = &InterfaceDescriptor> {
    config.interfaces.iter().filter_map(move |interface| {
        interface
            .alt_settings
            .iter()
            .find(|alt| should_enumerate(vendor_id, alt))
    })
}

/// List HID interfaces, optionally filtered by vendor and product (0 matches any)
pub(crate) fn enumerate(shared: &Shared, vendor_id: u16, product_id: u16) -> HidResult<Vec<DeviceInfo>> {
    let mut found = Vec::new();

    for device in shared.backend.devices()? {
        let descriptor = match device.device_descriptor() {
            Ok(desc) => desc,
            Err(e) => {
                debug!(
                    "Skipping device on bus {}: no device descriptor ({})",
                    device.bus_number(),
                    e
                );
                continue;
            }
        };

        let (vid, pid) = (descriptor.vendor_id, descriptor.product_id);
        if (vendor_id != 0 && vendor_id != vid) || (product_id != 0 && product_id != pid) {
            continue;
        }
        if is_denylisted(vid, pid) {
            debug!("Skipping deny-listed device {:04x}:{:04x}", vid, pid);
            continue;
        }

        let Some(config) = device_config(device.as_ref()) else {
            continue;
        };

        for interface in hid_interfaces(vid, &config) {
            let handle = device
                .open()
                .map_err(|e| debug!("Can't open {:04x}:{:04x}: {}", vid, pid, e))
                .ok();

            let path = resolve_path(device.as_ref(), config.number, interface.interface_number);
            let mut info = device_info(
                shared,
                path,
                handle.as_deref(),
                &descriptor,
                interface,
            );

            if shared.config.usb.invasive_usage
                && let Some(handle) = handle
            {
                let usage = probe_usage(shared, handle, interface);
                info.usage_page = usage.usage_page;
                info.usage = usage.usage;
            }

            trace!("Found HID interface {}", info.path);
            found.push(info);
        }
    }

    debug!("Enumerated {} HID interface(s)", found.len());
    Ok(found)
}

/// Build the record for one interface; strings are read only when `handle` is given
pub(crate) fn device_info(
    shared: &Shared,
    path: String,
    handle: Option<&dyn UsbHandle>,
    descriptor: &UsbDeviceDescriptor,
    interface: &InterfaceDescriptor,
) -> DeviceInfo {
    let mut info = DeviceInfo {
        path,
        vendor_id: descriptor.vendor_id,
        product_id: descriptor.product_id,
        serial_number: None,
        release_number: descriptor.release_number,
        manufacturer_string: None,
        product_string: None,
        usage_page: 0,
        usage: 0,
        interface_number: interface.interface_number,
        interface_class: interface.class_code,
        interface_subclass: interface.sub_class_code,
        interface_protocol: interface.protocol_code,
        bus_type: BusType::Usb,
    };

    if let Some(handle) = handle {
        info.serial_number =
            read_optional_string(handle, descriptor.serial_number_index, shared.language);
        let strings = shared
            .strings
            .resolve_vendor_product(descriptor, handle, shared.language);
        info.manufacturer_string = strings.manufacturer;
        info.product_string = strings.product;
    }

    info
}

/// Claim the interface just long enough to read its Usage Page and Usage
fn probe_usage(shared: &Shared, handle: Box<dyn UsbHandle>, interface: &InterfaceDescriptor) -> Usage {
    let number = interface.interface_number;
    let claim = match ClaimedInterface::acquire(handle, number, shared.config.usb.detach_kernel_driver) {
        Ok(claim) => claim,
        Err(e) => {
            debug!("Usage probe skipped for interface {}: {}", number, e);
            return Usage::default();
        }
    };

    let size = report_descriptor_length(&interface.extra);
    match read_report_descriptor(claim.handle().as_ref(), number, size) {
        Ok(descriptor) => find_first_usage(&descriptor).or_zero(),
        Err(e) => {
            debug!("Can't read report descriptor of interface {}: {}", number, e);
            Usage::default()
        }
    }
}
