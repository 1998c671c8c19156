//! Device quirk detection and initialization
//!
//! Runs on every open, after the interface is claimed. Anything that goes
//! wrong here is logged and otherwise ignored: a controller that was not
//! activated still opens.

use crate::transport::UsbHandle;
use hid_protocol::quirks::{
    self, QuirkFlags, VENDOR_MICROSOFT, XBOX360_ACTIVATION, is_xbox360, is_xboxone,
    is_xboxone_interface,
};
use hid_protocol::types::request_type;
use hid_protocol::{ConfigDescriptor, InterfaceDescriptor};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Vendor request that makes some Xbox 360 clones start reporting input
const XBOX360_ACTIVATION_REQUEST: u8 = 0x01;
const XBOX360_ACTIVATION_VALUE: u16 = 0x0100;
const XBOX360_ACTIVATION_LEN: usize = 20;
const XBOX360_ACTIVATION_TIMEOUT: Duration = Duration::from_millis(100);

/// Detect quirks for an opened interface and run device initialization
///
/// `handle` must have exclusive access; the Xbox One path claims and
/// releases other interfaces of the device.
pub fn detect_and_init(
    handle: &mut dyn UsbHandle,
    vendor_id: u16,
    product_id: u16,
    interface: &InterfaceDescriptor,
    config: &ConfigDescriptor,
) -> QuirkFlags {
    let mut flags = quirks::product_quirks(vendor_id, product_id);

    if is_xbox360(vendor_id, interface) {
        // Xbox 360 reports always start with a message type, never a report id
        flags.no_skip_output_report_id = true;
        init_xbox360(handle, vendor_id, product_id);
    }

    if is_xboxone(vendor_id, interface) {
        init_xboxone(handle, vendor_id, config);
    }

    if flags != QuirkFlags::default() {
        debug!(
            "Quirks for {:04x}:{:04x}: {:?}",
            vendor_id, product_id, flags
        );
    }
    flags
}

/// Send the activation request if this controller needs it
pub fn init_xbox360(handle: &dyn UsbHandle, vendor_id: u16, product_id: u16) {
    let Some(entry) = quirks::lookup(XBOX360_ACTIVATION, vendor_id, product_id) else {
        return;
    };

    let mut buf = [0u8; XBOX360_ACTIVATION_LEN];
    match handle.read_control(
        request_type::VENDOR_INTERFACE_IN,
        XBOX360_ACTIVATION_REQUEST,
        XBOX360_ACTIVATION_VALUE,
        0,
        &mut buf,
        XBOX360_ACTIVATION_TIMEOUT,
    ) {
        Ok(_) => info!("Activated {} ({:04x}:{:04x})", entry.name, vendor_id, product_id),
        Err(e) => warn!(
            "Activation of {} ({:04x}:{:04x}) failed: {}",
            entry.name, vendor_id, product_id, e
        ),
    }
}

/// Select the alternate settings Xbox One controllers need to send input
///
/// Microsoft controllers want interface 0 at alternate setting 1; every
/// other controller interface is reset to alternate setting 0.
pub fn init_xboxone(handle: &mut dyn UsbHandle, vendor_id: u16, config: &ConfigDescriptor) {
    for alt in config.alt_settings().filter(|alt| is_xboxone_interface(alt)) {
        let number = alt.interface_number;
        let setting = alt.alternate_setting;

        let wanted = (vendor_id == VENDOR_MICROSOFT && number == 0 && setting == 1)
            || (number != 0 && setting == 0);
        if !wanted {
            continue;
        }

        if let Err(e) = handle.claim_interface(number) {
            warn!("Can't claim interface {} for Xbox One init: {}", number, e);
            continue;
        }

        debug!(
            "Setting alternate setting {} on interface {}",
            setting, number
        );
        if let Err(e) = handle.set_alternate_setting(number, setting) {
            warn!(
                "Can't set alternate setting {} on interface {}: {}",
                setting, number, e
            );
        }

        if let Err(e) = handle.release_interface(number) {
            warn!("Can't release interface {} after Xbox One init: {}", number, e);
        }
    }
}
