//! Device quirk tables
//!
//! Vendor and product lists that change how a device is discovered, opened or
//! written to. The tables are plain data so new entries can be added without
//! touching control flow; the side effects that go with them (control
//! transfers, alternate settings) live in the HID engine.

use crate::types::{CLASS_HID, CLASS_VENDOR_SPEC, InterfaceDescriptor};

/// A vendor, or a single product of a vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatch {
    pub vendor_id: u16,
    /// None matches every product of the vendor
    pub product_id: Option<u16>,
    pub name: &'static str,
}

impl DeviceMatch {
    const fn vendor(vendor_id: u16, name: &'static str) -> Self {
        Self {
            vendor_id,
            product_id: None,
            name,
        }
    }

    const fn product(vendor_id: u16, product_id: u16, name: &'static str) -> Self {
        Self {
            vendor_id,
            product_id: Some(product_id),
            name,
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id.is_none_or(|pid| pid == product_id)
    }
}

/// First entry of `table` matching the ids
pub fn lookup(table: &'static [DeviceMatch], vendor_id: u16, product_id: u16) -> Option<&'static DeviceMatch> {
    table.iter().find(|m| m.matches(vendor_id, product_id))
}

fn has_vendor(table: &[DeviceMatch], vendor_id: u16) -> bool {
    table.iter().any(|m| m.vendor_id == vendor_id)
}

/// Vendors shipping Xbox 360 compatible controllers
pub const XBOX360_VENDORS: &[DeviceMatch] = &[
    DeviceMatch::vendor(0x0079, "GPD Win 2"),
    DeviceMatch::vendor(0x044f, "Thrustmaster"),
    DeviceMatch::vendor(0x045e, "Microsoft"),
    DeviceMatch::vendor(0x046d, "Logitech"),
    DeviceMatch::vendor(0x056e, "Elecom"),
    DeviceMatch::vendor(0x06a3, "Saitek"),
    DeviceMatch::vendor(0x0738, "Mad Catz"),
    DeviceMatch::vendor(0x07ff, "Mad Catz"),
    DeviceMatch::vendor(0x0e6f, "PDP"),
    DeviceMatch::vendor(0x0f0d, "Hori"),
    DeviceMatch::vendor(0x1038, "SteelSeries"),
    DeviceMatch::vendor(0x11c9, "Nacon"),
    DeviceMatch::vendor(0x12ab, "Unknown"),
    DeviceMatch::vendor(0x1430, "RedOctane"),
    DeviceMatch::vendor(0x146b, "BigBen"),
    DeviceMatch::vendor(0x1532, "Razer Sabertooth"),
    DeviceMatch::vendor(0x15e4, "Numark"),
    DeviceMatch::vendor(0x162e, "Joytech"),
    DeviceMatch::vendor(0x1689, "Razer Onza"),
    DeviceMatch::vendor(0x1949, "Lab126"),
    DeviceMatch::vendor(0x1bad, "Harmonix"),
    DeviceMatch::vendor(0x20d6, "PowerA"),
    DeviceMatch::vendor(0x24c6, "PowerA"),
    DeviceMatch::vendor(0x2c22, "Qanba"),
    DeviceMatch::vendor(0x2dc8, "8BitDo"),
    DeviceMatch::vendor(0x9886, "ASTRO Gaming"),
];

/// Vendors shipping Xbox One compatible controllers
pub const XBOXONE_VENDORS: &[DeviceMatch] = &[
    DeviceMatch::vendor(0x03f0, "HP"),
    DeviceMatch::vendor(0x044f, "Thrustmaster"),
    DeviceMatch::vendor(0x045e, "Microsoft"),
    DeviceMatch::vendor(0x0738, "Mad Catz"),
    DeviceMatch::vendor(0x0b05, "ASUS"),
    DeviceMatch::vendor(0x0e6f, "PDP"),
    DeviceMatch::vendor(0x0f0d, "Hori"),
    DeviceMatch::vendor(0x10f5, "Turtle Beach"),
    DeviceMatch::vendor(0x1532, "Razer Wildcat"),
    DeviceMatch::vendor(0x20d6, "PowerA"),
    DeviceMatch::vendor(0x24c6, "PowerA"),
    DeviceMatch::vendor(0x2dc8, "8BitDo"),
    DeviceMatch::vendor(0x2e24, "Hyperkin"),
    DeviceMatch::vendor(0x3537, "GameSir"),
];

/// Xbox 360 controllers that only report input after a vendor request
pub const XBOX360_ACTIVATION: &[DeviceMatch] = &[
    DeviceMatch::product(0x05ac, 0x055b, "Gamesir-G3w"),
    DeviceMatch::product(0x20d6, 0x4010, "PowerA Battle Dragon Advanced Wireless Controller"),
    // Also needed by the HORIPAD FPS for Nintendo Switch; other HORI
    // controllers sharing the vendor accept it too.
    DeviceMatch::vendor(0x0f0d, "Hori"),
];

/// Devices that hang or misbehave when queried during enumeration
pub const ENUMERATION_DENYLIST: &[DeviceMatch] = &[DeviceMatch::product(
    0x1532,
    0x0227,
    "Razer Huntsman Gaming keyboard",
)];

/// Devices whose output reports never carry a report id and must go over
/// the control endpoint
pub const SONY_OUTPUT_QUIRKS: &[DeviceMatch] = &[
    DeviceMatch::product(0x054c, 0x0268, "Sony PS3 Controller"),
    DeviceMatch::product(0x054c, 0x042f, "Sony Navigation Controller"),
];

/// VID/PID pairs reused across many distinct products
pub const NON_UNIQUE_IDS: &[DeviceMatch] = &[DeviceMatch::product(0x0f0d, 0x00dc, "HORI")];

/// Microsoft's vendor id
pub const VENDOR_MICROSOFT: u16 = 0x045e;

pub const XBOX360_SUBCLASS: u8 = 93;
pub const XBOX360_PROTOCOL_WIRED: u8 = 1;
pub const XBOX360_PROTOCOL_WIRELESS: u8 = 129;

pub const XBOXONE_SUBCLASS: u8 = 71;
pub const XBOXONE_PROTOCOL: u8 = 208;

/// Output and enumeration behavior adjustments for an open device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuirkFlags {
    /// Always drop the first byte of an output report
    pub skip_output_report_id: bool,
    /// Never drop a leading report id 0 from output reports
    pub no_skip_output_report_id: bool,
    /// Send output reports with SET_REPORT even if an interrupt OUT endpoint exists
    pub no_output_reports_on_interrupt_ep: bool,
}

/// Whether an interface belongs to an Xbox 360 controller
pub fn is_xbox360(vendor_id: u16, interface: &InterfaceDescriptor) -> bool {
    interface.class_code == CLASS_VENDOR_SPEC
        && interface.sub_class_code == XBOX360_SUBCLASS
        && matches!(
            interface.protocol_code,
            XBOX360_PROTOCOL_WIRED | XBOX360_PROTOCOL_WIRELESS
        )
        && has_vendor(XBOX360_VENDORS, vendor_id)
}

/// Whether an interface is the control interface of an Xbox One controller
pub fn is_xboxone(vendor_id: u16, interface: &InterfaceDescriptor) -> bool {
    interface.interface_number == 0 && is_xboxone_interface(interface) && has_vendor(XBOXONE_VENDORS, vendor_id)
}

/// Class triple shared by every Xbox One controller interface
pub fn is_xboxone_interface(interface: &InterfaceDescriptor) -> bool {
    interface.class_code == CLASS_VENDOR_SPEC
        && interface.sub_class_code == XBOXONE_SUBCLASS
        && interface.protocol_code == XBOXONE_PROTOCOL
}

/// Whether enumeration should report this interface
///
/// HID-class interfaces always qualify. Xbox controllers expose a
/// vendor-specific class but are reported through the same API.
pub fn should_enumerate(vendor_id: u16, interface: &InterfaceDescriptor) -> bool {
    interface.class_code == CLASS_HID || is_xbox360(vendor_id, interface) || is_xboxone(vendor_id, interface)
}

/// Whether a device is skipped during enumeration
pub fn is_denylisted(vendor_id: u16, product_id: u16) -> bool {
    lookup(ENUMERATION_DENYLIST, vendor_id, product_id).is_some()
}

/// Whether manufacturer/product strings may be cached by VID/PID
pub fn strings_cacheable(vendor_id: u16, product_id: u16) -> bool {
    vendor_id != 0 && product_id != 0 && lookup(NON_UNIQUE_IDS, vendor_id, product_id).is_none()
}

/// Flags implied by the vendor/product id alone
pub fn product_quirks(vendor_id: u16, product_id: u16) -> QuirkFlags {
    let mut flags = QuirkFlags::default();
    if lookup(SONY_OUTPUT_QUIRKS, vendor_id, product_id).is_some() {
        flags.skip_output_report_id = true;
        flags.no_output_reports_on_interrupt_ep = true;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(number: u8, class: u8, subclass: u8, protocol: u8) -> InterfaceDescriptor {
        InterfaceDescriptor {
            interface_number: number,
            alternate_setting: 0,
            class_code: class,
            sub_class_code: subclass,
            protocol_code: protocol,
            endpoints: Vec::new(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(XBOX360_VENDORS.len(), 26);
        assert_eq!(XBOXONE_VENDORS.len(), 14);
    }

    #[test]
    fn test_xbox360_detection() {
        let wired = interface(0, CLASS_VENDOR_SPEC, 93, 1);
        let wireless = interface(0, CLASS_VENDOR_SPEC, 93, 129);

        assert!(is_xbox360(0x045e, &wired));
        assert!(is_xbox360(0x045e, &wireless));
        assert!(!is_xbox360(0x1111, &wired));
        assert!(!is_xbox360(0x045e, &interface(0, CLASS_VENDOR_SPEC, 93, 2)));
        assert!(!is_xbox360(0x045e, &interface(0, CLASS_HID, 93, 1)));
    }

    #[test]
    fn test_xboxone_detection() {
        assert!(is_xboxone(0x045e, &interface(0, CLASS_VENDOR_SPEC, 71, 208)));
        assert!(is_xboxone(0x3537, &interface(0, CLASS_VENDOR_SPEC, 71, 208)));
        // only interface 0 is the controller's main interface
        assert!(!is_xboxone(0x045e, &interface(1, CLASS_VENDOR_SPEC, 71, 208)));
        assert!(!is_xboxone(0x1111, &interface(0, CLASS_VENDOR_SPEC, 71, 208)));
        assert!(is_xboxone_interface(&interface(2, CLASS_VENDOR_SPEC, 71, 208)));
    }

    #[test]
    fn test_should_enumerate() {
        assert!(should_enumerate(0x1111, &interface(0, CLASS_HID, 0, 0)));
        assert!(should_enumerate(0x0f0d, &interface(0, CLASS_VENDOR_SPEC, 93, 1)));
        assert!(!should_enumerate(0x1111, &interface(0, CLASS_VENDOR_SPEC, 93, 1)));
        assert!(!should_enumerate(0x045e, &interface(0, 0x08, 0x06, 0x50)));
    }

    #[test]
    fn test_denylist() {
        assert!(is_denylisted(0x1532, 0x0227));
        assert!(!is_denylisted(0x1532, 0x0228));
    }

    #[test]
    fn test_strings_cacheable() {
        assert!(strings_cacheable(0x046d, 0xc52b));
        assert!(!strings_cacheable(0, 0xc52b));
        assert!(!strings_cacheable(0x046d, 0));
        assert!(!strings_cacheable(0x0f0d, 0x00dc));
        assert!(strings_cacheable(0x0f0d, 0x00c1));
    }

    #[test]
    fn test_activation_table() {
        assert!(lookup(XBOX360_ACTIVATION, 0x0f0d, 0x1234).is_some());
        assert!(lookup(XBOX360_ACTIVATION, 0x20d6, 0x4010).is_some());
        assert!(lookup(XBOX360_ACTIVATION, 0x20d6, 0x4011).is_none());
    }

    #[test]
    fn test_sony_quirks() {
        let flags = product_quirks(0x054c, 0x0268);
        assert!(flags.skip_output_report_id);
        assert!(flags.no_output_reports_on_interrupt_ep);
        assert!(!flags.no_skip_output_report_id);

        assert_eq!(product_quirks(0x054c, 0x05c4), QuirkFlags::default());
    }
}
