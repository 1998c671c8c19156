//! Integration tests for device discovery
//!
//! Runs `HidApi::enumerate` against the in-memory transport, covering:
//! - Vendor/product filtering and the enumeration deny-list
//! - Xbox controller discovery on vendor-specific interfaces
//! - Path generation for multi-interface and nested-hub devices
//! - Manufacturer/product string caching
//! - The opt-in usage probe

use std::sync::Arc;
use usbhid::mock::{
    MANUFACTURER_INDEX, MockBackend, MockDevice, PRODUCT_INDEX, SERIAL_INDEX, class_interface,
    config_of, hid_interface, interrupt_endpoint,
};
use usbhid::{HidApi, HidConfig};

const VENDOR_CLASS: u8 = 0xff;

fn api_with(devices: Vec<MockDevice>) -> (HidApi, Vec<MockDevice>) {
    let backend = Arc::new(MockBackend::new());
    let devices = devices.into_iter().map(|d| backend.add(d)).collect();
    (HidApi::with_backend(backend, HidConfig::default()), devices)
}

mod filtering {
    use super::*;

    #[test]
    fn test_wildcard_lists_everything() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001).with_location(1, &[1]),
            MockDevice::hid(0x1234, 0x0002).with_location(1, &[2]),
            MockDevice::hid(0x4321, 0x0001).with_location(2, &[1]),
        ]);

        let devices = api.enumerate(0, 0).unwrap();
        let paths: Vec<_> = devices.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["1-1:1.0", "1-2:1.0", "2-1:1.0"]);
    }

    #[test]
    fn test_vendor_filter() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001).with_location(1, &[1]),
            MockDevice::hid(0x1234, 0x0002).with_location(1, &[2]),
            MockDevice::hid(0x4321, 0x0001).with_location(2, &[1]),
        ]);

        let devices = api.enumerate(0x1234, 0).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices.iter().all(|d| d.vendor_id == 0x1234));
    }

    #[test]
    fn test_vendor_and_product_filter() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001).with_location(1, &[1]),
            MockDevice::hid(0x1234, 0x0002).with_location(1, &[2]),
        ]);

        let devices = api.enumerate(0x1234, 0x0002).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].path, "1-2:1.0");
    }

    #[test]
    fn test_no_match_is_empty() {
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x0001)]);
        assert!(api.enumerate(0xdead, 0xbeef).unwrap().is_empty());
    }

    #[test]
    fn test_denylisted_device_is_skipped() {
        let (api, devices) = api_with(vec![
            MockDevice::hid(0x1532, 0x0227).with_location(1, &[1]),
            MockDevice::hid(0x1532, 0x0228).with_location(1, &[2]),
        ]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_id, 0x0228);
        assert_eq!(devices[0].log().opens, 0);
    }

    #[test]
    fn test_unreadable_descriptor_is_skipped() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001)
                .with_location(1, &[1])
                .with_descriptor_error(rusb::Error::Io),
            MockDevice::hid(0x1234, 0x0002).with_location(1, &[2]),
        ]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_id, 0x0002);
    }

    #[test]
    fn test_non_hid_interfaces_are_ignored() {
        let config = config_of(vec![
            class_interface(0, 0, 0x08, 0x06, 0x50),
            hid_interface(1, vec![interrupt_endpoint(0x82, 8)]),
        ]);
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x0001).with_config(config)]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].interface_number, 1);
        assert_eq!(listed[0].interface_class, 0x03);
    }
}

mod xbox_discovery {
    use super::*;

    #[test]
    fn test_xbox360_vendor_interface_is_listed() {
        let config = config_of(vec![class_interface(0, 0, VENDOR_CLASS, 93, 1)]);
        let (api, _) = api_with(vec![MockDevice::hid(0x045e, 0x028e).with_config(config)]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].interface_class, VENDOR_CLASS);
        assert_eq!(listed[0].interface_subclass, 93);
        assert_eq!(listed[0].interface_protocol, 1);
    }

    #[test]
    fn test_unknown_vendor_interface_is_not_listed() {
        let config = config_of(vec![class_interface(0, 0, VENDOR_CLASS, 93, 1)]);
        let (api, _) = api_with(vec![MockDevice::hid(0x1111, 0x0001).with_config(config)]);

        assert!(api.enumerate(0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_xboxone_lists_first_alt_setting_only() {
        let config = config_of(vec![
            class_interface(0, 0, VENDOR_CLASS, 71, 208),
            class_interface(0, 1, VENDOR_CLASS, 71, 208),
        ]);
        let (api, devices) = api_with(vec![MockDevice::hid(0x045e, 0x02ea).with_config(config)]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "1-1:1.0");
        // Enumeration never runs device initialization
        assert!(devices[0].log().alt_settings.is_empty());
    }
}

mod paths {
    use super::*;

    #[test]
    fn test_interfaces_get_distinct_paths() {
        let config = config_of(vec![
            hid_interface(0, vec![interrupt_endpoint(0x81, 8)]),
            hid_interface(1, vec![interrupt_endpoint(0x82, 8)]),
        ]);
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x0001).with_config(config)]);

        let first = api.enumerate(0, 0).unwrap();
        let paths: Vec<_> = first.iter().map(|d| d.path.clone()).collect();
        assert_eq!(paths, vec!["1-1:1.0", "1-1:1.1"]);

        let second = api.enumerate(0, 0).unwrap();
        let again: Vec<_> = second.iter().map(|d| d.path.clone()).collect();
        assert_eq!(paths, again);
    }

    #[test]
    fn test_nested_hub_path() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001).with_location(3, &[2, 4, 1]),
        ]);
        assert_eq!(api.enumerate(0, 0).unwrap()[0].path, "3-2.4.1:1.0");
    }

    #[test]
    fn test_default_config_fallback() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x0001).with_active_config_error(rusb::Error::NotFound),
        ]);
        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "1-1:1.0");
    }
}

mod strings {
    use super::*;

    #[test]
    fn test_record_fields() {
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x5678).with_release(0x0210)]);

        let info = &api.enumerate(0, 0).unwrap()[0];
        assert_eq!(info.vendor_id, 0x1234);
        assert_eq!(info.product_id, 0x5678);
        assert_eq!(info.release_number, 0x0210);
        assert_eq!(info.manufacturer_string.as_deref(), Some("Mock Manufacturer"));
        assert_eq!(info.product_string.as_deref(), Some("Mock HID"));
        assert_eq!(info.serial_number.as_deref(), Some("MOCK0001"));
        assert_eq!((info.usage_page, info.usage), (0, 0));
        assert_eq!(info.bus_type, usbhid::BusType::Usb);
    }

    #[test]
    fn test_second_enumeration_uses_cache() {
        let (api, devices) = api_with(vec![MockDevice::hid(0x1234, 0x5678)]);

        api.enumerate(0, 0).unwrap();
        let listed = api.enumerate(0, 0).unwrap();

        let log = devices[0].log();
        assert_eq!(log.string_reads(MANUFACTURER_INDEX), 1);
        assert_eq!(log.string_reads(PRODUCT_INDEX), 1);
        // Serial numbers are per unit and never cached
        assert_eq!(log.string_reads(SERIAL_INDEX), 2);
        assert_eq!(listed[0].product_string.as_deref(), Some("Mock HID"));
        assert_eq!(api.string_cache_len(), 1);
    }

    #[test]
    fn test_shared_ids_are_never_cached() {
        let (api, devices) = api_with(vec![MockDevice::hid(0x0f0d, 0x00dc)]);

        api.enumerate(0, 0).unwrap();
        api.enumerate(0, 0).unwrap();

        assert_eq!(devices[0].log().string_reads(PRODUCT_INDEX), 2);
        assert_eq!(api.string_cache_len(), 0);
    }

    #[test]
    fn test_open_failure_leaves_strings_empty() {
        let (api, _) = api_with(vec![
            MockDevice::hid(0x1234, 0x5678).with_open_error(rusb::Error::Access),
        ]);

        let listed = api.enumerate(0, 0).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].manufacturer_string.is_none());
        assert!(listed[0].serial_number.is_none());
    }

    #[test]
    fn test_missing_serial_index() {
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x5678).without_string(SERIAL_INDEX)]);
        assert!(api.enumerate(0, 0).unwrap()[0].serial_number.is_none());
    }

    #[test]
    fn test_exit_clears_cache() {
        let (api, _) = api_with(vec![MockDevice::hid(0x1234, 0x5678)]);
        api.enumerate(0, 0).unwrap();

        let other = api.clone();
        api.exit();
        assert_eq!(other.string_cache_len(), 0);
    }
}

mod usage_probe {
    use super::*;

    fn invasive_api(device: MockDevice) -> (HidApi, MockDevice) {
        let backend = Arc::new(MockBackend::new());
        let device = backend.add(device);
        let mut config = HidConfig::default();
        config.usb.invasive_usage = true;
        (HidApi::with_backend(backend, config), device)
    }

    #[test]
    fn test_usage_is_read_when_enabled() {
        let (api, device) = invasive_api(MockDevice::hid(0x1234, 0x5678));

        let info = &api.enumerate(0, 0).unwrap()[0];
        assert_eq!(info.usage_page, 0x01);
        assert_eq!(info.usage, 0x02);

        let log = device.log();
        assert_eq!(log.claimed, vec![0]);
        assert_eq!(log.released, vec![0]);
    }

    #[test]
    fn test_probe_restores_kernel_driver() {
        let (api, device) = invasive_api(MockDevice::hid(0x1234, 0x5678).with_kernel_driver(0));

        api.enumerate(0, 0).unwrap();

        let log = device.log();
        if cfg!(target_os = "freebsd") {
            assert!(log.detached.is_empty());
        } else {
            assert_eq!(log.detached, vec![0]);
            assert_eq!(log.attached, vec![0]);
        }
        assert!(device.kernel_driver_bound(0));
    }

    #[test]
    fn test_claim_failure_leaves_usage_zero() {
        let (api, device) = invasive_api(
            MockDevice::hid(0x1234, 0x5678).with_claim_error(0, rusb::Error::Busy),
        );

        let info = &api.enumerate(0, 0).unwrap()[0];
        assert_eq!((info.usage_page, info.usage), (0, 0));
        assert!(device.log().released.is_empty());
    }
}
