//! In-memory USB transport for tests
//!
//! [`MockBackend`] serves a configurable set of [`MockDevice`]s. Each device
//! answers the standard and HID class requests the engine issues (string
//! descriptors, report descriptors, GET_REPORT), records every transfer and
//! interface operation in a [`MockLog`], and lets a test inject input reports
//! or a disconnect into the interrupt-IN endpoint.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use usbhid::mock::{MockBackend, MockDevice};
//! use usbhid::{HidApi, HidConfig};
//!
//! let backend = Arc::new(MockBackend::new());
//! backend.add(MockDevice::hid(0x1234, 0x5678));
//!
//! let api = HidApi::with_backend(backend.clone(), HidConfig::default());
//! let devices = api.enumerate(0, 0).unwrap();
//! assert_eq!(devices.len(), 1);
//! assert_eq!(devices[0].path, "1-1:1.0");
//! ```

use crate::transport::{UsbBackend, UsbDevice, UsbHandle, UsbResult};
use hid_common::test_utils::{
    create_mock_hid_descriptor, create_mock_report_descriptor, encode_language_ids,
    encode_string_descriptor,
};
use hid_protocol::types::{
    CLASS_HID, DT_REPORT, DT_STRING, HID_GET_REPORT, REQUEST_GET_DESCRIPTOR, request_type as rt,
};
use hid_protocol::{
    ConfigDescriptor, EndpointDescriptor, Interface, InterfaceDescriptor, ReportType,
    TransferKind, UsbDeviceDescriptor,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// A control request as seen on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: usize,
}

/// Everything a mock device has been asked to do
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    /// Device-to-host control requests
    pub control_in: Vec<ControlRequest>,
    /// Host-to-device control requests with their data stage
    pub control_out: Vec<(ControlRequest, Vec<u8>)>,
    /// Interrupt-OUT transfers (endpoint, data)
    pub interrupt_out: Vec<(u8, Vec<u8>)>,
    /// Successful string descriptor fetches per index (language list excluded)
    pub string_reads: HashMap<u8, usize>,
    pub claimed: Vec<u8>,
    pub released: Vec<u8>,
    pub detached: Vec<u8>,
    pub attached: Vec<u8>,
    /// set_alternate_setting calls (interface, setting)
    pub alt_settings: Vec<(u8, u8)>,
    /// Number of times the device was opened
    pub opens: usize,
}

impl MockLog {
    /// Fetches of string descriptor `index`
    pub fn string_reads(&self, index: u8) -> usize {
        self.string_reads.get(&index).copied().unwrap_or(0)
    }
}

/// Data injected into the interrupt-IN endpoint
#[derive(Debug, Clone)]
pub enum MockInput {
    Report(Vec<u8>),
    Disconnect,
}

#[derive(Debug, Clone)]
struct MockSpec {
    bus: u8,
    ports: UsbResult<Vec<u8>>,
    descriptor: UsbResult<UsbDeviceDescriptor>,
    active_config: UsbResult<ConfigDescriptor>,
    configs: Vec<ConfigDescriptor>,
    languages: Vec<u16>,
    strings: HashMap<u8, String>,
    report_descriptors: HashMap<u8, Vec<u8>>,
    reports: HashMap<(u8, u8), Vec<u8>>,
    open_error: Option<rusb::Error>,
    claim_errors: HashMap<u8, rusb::Error>,
    kernel_drivers: HashSet<u8>,
}

struct Inner {
    spec: Mutex<MockSpec>,
    log: Mutex<MockLog>,
    input_tx: Mutex<Sender<MockInput>>,
    input_rx: Mutex<Receiver<MockInput>>,
    disconnected: AtomicBool,
}

/// A simulated USB device; clones share state
#[derive(Clone)]
pub struct MockDevice {
    inner: Arc<Inner>,
}

pub const MANUFACTURER_INDEX: u8 = 1;
pub const PRODUCT_INDEX: u8 = 2;
pub const SERIAL_INDEX: u8 = 3;

/// Interrupt endpoint descriptor
pub fn interrupt_endpoint(address: u8, max_packet_size: u16) -> EndpointDescriptor {
    EndpointDescriptor {
        address,
        kind: TransferKind::Interrupt,
        max_packet_size,
    }
}

/// Alternate setting 0 of a HID interface with the given endpoints
pub fn hid_interface(number: u8, endpoints: Vec<EndpointDescriptor>) -> InterfaceDescriptor {
    InterfaceDescriptor {
        interface_number: number,
        alternate_setting: 0,
        class_code: CLASS_HID,
        sub_class_code: 0,
        protocol_code: 0,
        endpoints,
        extra: create_mock_hid_descriptor(create_mock_report_descriptor().len() as u16),
    }
}

/// An alternate setting with an arbitrary class triple and interrupt IN/OUT endpoints
pub fn class_interface(
    number: u8,
    alternate_setting: u8,
    class_code: u8,
    sub_class_code: u8,
    protocol_code: u8,
) -> InterfaceDescriptor {
    InterfaceDescriptor {
        interface_number: number,
        alternate_setting,
        class_code,
        sub_class_code,
        protocol_code,
        endpoints: vec![
            interrupt_endpoint(0x81 + number, 32),
            interrupt_endpoint(0x01 + number, 32),
        ],
        extra: Vec::new(),
    }
}

/// Group alternate settings by interface number into configuration 1
pub fn config_of(alt_settings: Vec<InterfaceDescriptor>) -> ConfigDescriptor {
    let mut interfaces: Vec<Interface> = Vec::new();
    for alt in alt_settings {
        match interfaces
            .iter_mut()
            .find(|i| i.number == alt.interface_number)
        {
            Some(interface) => interface.alt_settings.push(alt),
            None => interfaces.push(Interface {
                number: alt.interface_number,
                alt_settings: vec![alt],
            }),
        }
    }
    ConfigDescriptor {
        number: 1,
        interfaces,
    }
}

impl MockDevice {
    /// A single-interface HID device on bus 1, port 1
    ///
    /// Interface 0 has interrupt endpoints 0x81 (IN) and 0x01 (OUT) of 64
    /// bytes, a boot mouse report descriptor and English strings.
    pub fn hid(vendor_id: u16, product_id: u16) -> Self {
        let config = config_of(vec![hid_interface(
            0,
            vec![interrupt_endpoint(0x81, 64), interrupt_endpoint(0x01, 64)],
        )]);

        let spec = MockSpec {
            bus: 1,
            ports: Ok(vec![1]),
            descriptor: Ok(UsbDeviceDescriptor {
                vendor_id,
                product_id,
                release_number: 0x0100,
                manufacturer_index: Some(MANUFACTURER_INDEX),
                product_index: Some(PRODUCT_INDEX),
                serial_number_index: Some(SERIAL_INDEX),
            }),
            active_config: Ok(config.clone()),
            configs: vec![config],
            languages: vec![hid_protocol::LANG_EN_US],
            strings: HashMap::from([
                (MANUFACTURER_INDEX, "Mock Manufacturer".to_string()),
                (PRODUCT_INDEX, "Mock HID".to_string()),
                (SERIAL_INDEX, "MOCK0001".to_string()),
            ]),
            report_descriptors: HashMap::from([(0, create_mock_report_descriptor())]),
            reports: HashMap::new(),
            open_error: None,
            claim_errors: HashMap::new(),
            kernel_drivers: HashSet::new(),
        };

        let (tx, rx) = mpsc::channel();
        Self {
            inner: Arc::new(Inner {
                spec: Mutex::new(spec),
                log: Mutex::new(MockLog::default()),
                input_tx: Mutex::new(tx),
                input_rx: Mutex::new(rx),
                disconnected: AtomicBool::new(false),
            }),
        }
    }

    fn edit(self, f: impl FnOnce(&mut MockSpec)) -> Self {
        f(&mut self.inner.spec.lock());
        self
    }

    pub fn with_location(self, bus: u8, ports: &[u8]) -> Self {
        let ports = ports.to_vec();
        self.edit(|s| {
            s.bus = bus;
            s.ports = Ok(ports);
        })
    }

    /// Make reading the port chain fail
    pub fn with_ports_error(self, err: rusb::Error) -> Self {
        self.edit(|s| s.ports = Err(err))
    }

    pub fn with_release(self, release_number: u16) -> Self {
        self.edit(|s| {
            if let Ok(desc) = &mut s.descriptor {
                desc.release_number = release_number;
            }
        })
    }

    /// Make reading the device descriptor fail
    pub fn with_descriptor_error(self, err: rusb::Error) -> Self {
        self.edit(|s| s.descriptor = Err(err))
    }

    /// Replace the device's only configuration
    pub fn with_config(self, config: ConfigDescriptor) -> Self {
        self.edit(|s| {
            s.active_config = Ok(config.clone());
            s.configs = vec![config];
        })
    }

    /// Make reading the active configuration fail (index 0 still works)
    pub fn with_active_config_error(self, err: rusb::Error) -> Self {
        self.edit(|s| s.active_config = Err(err))
    }

    pub fn with_string(self, index: u8, text: &str) -> Self {
        let text = text.to_string();
        self.edit(|s| {
            s.strings.insert(index, text);
        })
    }

    /// Remove a string so fetching it stalls
    pub fn without_string(self, index: u8) -> Self {
        self.edit(|s| {
            s.strings.remove(&index);
        })
    }

    /// Languages listed in string descriptor 0
    pub fn with_languages(self, languages: &[u16]) -> Self {
        let languages = languages.to_vec();
        self.edit(|s| s.languages = languages)
    }

    pub fn with_report_descriptor(self, interface: u8, descriptor: &[u8]) -> Self {
        let descriptor = descriptor.to_vec();
        self.edit(|s| {
            s.report_descriptors.insert(interface, descriptor);
        })
    }

    /// Reply to GET_REPORT for this type and id
    pub fn with_report(self, report_type: ReportType, report_id: u8, data: &[u8]) -> Self {
        let data = data.to_vec();
        self.edit(|s| {
            s.reports.insert((report_type as u8, report_id), data);
        })
    }

    pub fn with_open_error(self, err: rusb::Error) -> Self {
        self.edit(|s| s.open_error = Some(err))
    }

    pub fn with_claim_error(self, interface: u8, err: rusb::Error) -> Self {
        self.edit(|s| {
            s.claim_errors.insert(interface, err);
        })
    }

    /// Bind a kernel driver to an interface
    pub fn with_kernel_driver(self, interface: u8) -> Self {
        self.edit(|s| {
            s.kernel_drivers.insert(interface);
        })
    }

    /// Snapshot of the recorded activity
    pub fn log(&self) -> MockLog {
        self.inner.log.lock().clone()
    }

    /// Forget recorded activity
    pub fn clear_log(&self) {
        *self.inner.log.lock() = MockLog::default();
    }

    /// Whether a kernel driver is currently bound to `interface`
    pub fn kernel_driver_bound(&self, interface: u8) -> bool {
        self.inner.spec.lock().kernel_drivers.contains(&interface)
    }

    /// Queue an input report on the interrupt-IN endpoint
    pub fn push_input(&self, data: &[u8]) {
        let _ = self
            .inner
            .input_tx
            .lock()
            .send(MockInput::Report(data.to_vec()));
    }

    /// Simulate unplugging: pending and future interrupt reads fail with NoDevice
    pub fn disconnect(&self) {
        let _ = self.inner.input_tx.lock().send(MockInput::Disconnect);
    }

    fn record_string_read(&self, index: u8) {
        *self.inner.log.lock().string_reads.entry(index).or_default() += 1;
    }
}

impl UsbDevice for MockDevice {
    fn bus_number(&self) -> u8 {
        self.inner.spec.lock().bus
    }

    fn port_numbers(&self) -> UsbResult<Vec<u8>> {
        self.inner.spec.lock().ports.clone()
    }

    fn device_descriptor(&self) -> UsbResult<UsbDeviceDescriptor> {
        self.inner.spec.lock().descriptor.clone()
    }

    fn active_config_descriptor(&self) -> UsbResult<ConfigDescriptor> {
        self.inner.spec.lock().active_config.clone()
    }

    fn config_descriptor(&self, index: u8) -> UsbResult<ConfigDescriptor> {
        self.inner
            .spec
            .lock()
            .configs
            .get(index as usize)
            .cloned()
            .ok_or(rusb::Error::NotFound)
    }

    fn open(&self) -> UsbResult<Box<dyn UsbHandle>> {
        if let Some(err) = self.inner.spec.lock().open_error {
            return Err(err);
        }
        self.inner.log.lock().opens += 1;
        Ok(Box::new(MockHandle {
            device: self.clone(),
        }))
    }
}

/// Open handle to a [`MockDevice`]
pub struct MockHandle {
    device: MockDevice,
}

impl MockHandle {
    fn spec(&self) -> parking_lot::MutexGuard<'_, MockSpec> {
        self.device.inner.spec.lock()
    }

    fn log(&self) -> parking_lot::MutexGuard<'_, MockLog> {
        self.device.inner.log.lock()
    }
}

fn copy_reply(reply: &[u8], buf: &mut [u8]) -> usize {
    let n = reply.len().min(buf.len());
    buf[..n].copy_from_slice(&reply[..n]);
    n
}

impl UsbHandle for MockHandle {
    fn device(&self) -> Box<dyn UsbDevice> {
        Box::new(self.device.clone())
    }

    fn kernel_driver_active(&self, interface: u8) -> UsbResult<bool> {
        Ok(self.spec().kernel_drivers.contains(&interface))
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> UsbResult<()> {
        if !self.spec().kernel_drivers.remove(&interface) {
            return Err(rusb::Error::NotFound);
        }
        self.log().detached.push(interface);
        Ok(())
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> UsbResult<()> {
        if !self.spec().kernel_drivers.insert(interface) {
            return Err(rusb::Error::Busy);
        }
        self.log().attached.push(interface);
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> UsbResult<()> {
        let spec = self.spec();
        if let Some(err) = spec.claim_errors.get(&interface) {
            return Err(*err);
        }
        if spec.kernel_drivers.contains(&interface) {
            return Err(rusb::Error::Busy);
        }
        drop(spec);
        self.log().claimed.push(interface);
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> UsbResult<()> {
        self.log().released.push(interface);
        Ok(())
    }

    fn set_alternate_setting(&mut self, interface: u8, setting: u8) -> UsbResult<()> {
        self.log().alt_settings.push((interface, setting));
        Ok(())
    }

    fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> UsbResult<usize> {
        self.log().control_in.push(ControlRequest {
            request_type,
            request,
            value,
            index,
            length: buf.len(),
        });

        let [descriptor_index, descriptor_type] = value.to_le_bytes();
        match (request_type, request) {
            (rt::STANDARD_DEVICE_IN, REQUEST_GET_DESCRIPTOR)
                if descriptor_type == DT_STRING =>
            {
                let reply = {
                    let spec = self.spec();
                    if descriptor_index == 0 {
                        if spec.languages.is_empty() {
                            return Err(rusb::Error::Pipe);
                        }
                        encode_language_ids(&spec.languages)
                    } else {
                        let text = spec
                            .strings
                            .get(&descriptor_index)
                            .ok_or(rusb::Error::Pipe)?;
                        encode_string_descriptor(text)
                    }
                };
                if descriptor_index != 0 {
                    self.device.record_string_read(descriptor_index);
                }
                Ok(copy_reply(&reply, buf))
            }
            (rt::STANDARD_INTERFACE_IN, REQUEST_GET_DESCRIPTOR)
                if descriptor_type == DT_REPORT =>
            {
                let spec = self.spec();
                let reply = spec
                    .report_descriptors
                    .get(&(index as u8))
                    .ok_or(rusb::Error::Pipe)?;
                Ok(copy_reply(reply, buf))
            }
            (rt::CLASS_INTERFACE_IN, HID_GET_REPORT) => {
                let spec = self.spec();
                let reply = spec
                    .reports
                    .get(&(descriptor_type, descriptor_index))
                    .ok_or(rusb::Error::Pipe)?;
                Ok(copy_reply(reply, buf))
            }
            _ => {
                buf.fill(0);
                Ok(buf.len())
            }
        }
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        _timeout: Duration,
    ) -> UsbResult<usize> {
        self.log().control_out.push((
            ControlRequest {
                request_type,
                request,
                value,
                index,
                length: buf.len(),
            },
            buf.to_vec(),
        ));
        Ok(buf.len())
    }

    fn read_interrupt(&self, _endpoint: u8, buf: &mut [u8], timeout: Duration) -> UsbResult<usize> {
        let inner = &self.device.inner;
        if inner.disconnected.load(Ordering::SeqCst) {
            return Err(rusb::Error::NoDevice);
        }

        match inner.input_rx.lock().recv_timeout(timeout) {
            Ok(MockInput::Report(data)) => Ok(copy_reply(&data, buf)),
            Ok(MockInput::Disconnect) | Err(RecvTimeoutError::Disconnected) => {
                inner.disconnected.store(true, Ordering::SeqCst);
                Err(rusb::Error::NoDevice)
            }
            Err(RecvTimeoutError::Timeout) => Err(rusb::Error::Timeout),
        }
    }

    fn write_interrupt(&self, endpoint: u8, buf: &[u8], _timeout: Duration) -> UsbResult<usize> {
        if self.device.inner.disconnected.load(Ordering::SeqCst) {
            return Err(rusb::Error::NoDevice);
        }
        self.log().interrupt_out.push((endpoint, buf.to_vec()));
        Ok(buf.len())
    }
}

/// A simulated libusb context
#[derive(Default)]
pub struct MockBackend {
    devices: Mutex<Vec<MockDevice>>,
    sys_devices: Mutex<HashMap<isize, MockDevice>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug in a device; returns a handle sharing its state
    pub fn add(&self, device: MockDevice) -> MockDevice {
        self.devices.lock().push(device.clone());
        device
    }

    /// Unplug a device from the listing
    pub fn remove(&self, device: &MockDevice) {
        self.devices
            .lock()
            .retain(|d| !Arc::ptr_eq(&d.inner, &device.inner));
    }

    /// Make `sys_dev` resolve to `device` in `wrap_sys_device`
    pub fn register_sys_device(&self, sys_dev: isize, device: MockDevice) -> MockDevice {
        self.sys_devices.lock().insert(sys_dev, device.clone());
        device
    }
}

impl UsbBackend for MockBackend {
    fn devices(&self) -> UsbResult<Vec<Box<dyn UsbDevice>>> {
        Ok(self
            .devices
            .lock()
            .iter()
            .map(|d| Box::new(d.clone()) as Box<dyn UsbDevice>)
            .collect())
    }

    fn wrap_sys_device(&self, sys_dev: isize) -> UsbResult<Box<dyn UsbHandle>> {
        let device = self
            .sys_devices
            .lock()
            .get(&sys_dev)
            .cloned()
            .ok_or(rusb::Error::InvalidParam)?;
        device.open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_requests() {
        let device = MockDevice::hid(0x1234, 0x5678).with_string(4, "Extra");
        let handle = device.open().unwrap();
        let mut buf = [0u8; 255];

        let n = handle
            .read_control(0x80, 0x06, 0x0300, 0, &mut buf, Duration::from_secs(1))
            .unwrap();
        assert_eq!(&buf[..n], &[4, 0x03, 0x09, 0x04]);

        let n = handle
            .read_control(0x80, 0x06, 0x0304, 0x0409, &mut buf, Duration::from_secs(1))
            .unwrap();
        assert_eq!(n, 12);
        assert_eq!(device.log().string_reads(4), 1);

        assert_eq!(
            handle.read_control(0x80, 0x06, 0x0309, 0x0409, &mut buf, Duration::from_secs(1)),
            Err(rusb::Error::Pipe)
        );
    }

    #[test]
    fn test_kernel_driver_bookkeeping() {
        let device = MockDevice::hid(0x1234, 0x5678).with_kernel_driver(0);
        let mut handle = device.open().unwrap();

        assert_eq!(handle.claim_interface(0), Err(rusb::Error::Busy));
        handle.detach_kernel_driver(0).unwrap();
        handle.claim_interface(0).unwrap();
        handle.release_interface(0).unwrap();
        handle.attach_kernel_driver(0).unwrap();

        let log = device.log();
        assert_eq!(log.detached, vec![0]);
        assert_eq!(log.claimed, vec![0]);
        assert_eq!(log.attached, vec![0]);
        assert!(device.kernel_driver_bound(0));
    }

    #[test]
    fn test_interrupt_input() {
        let device = MockDevice::hid(0x1234, 0x5678);
        let handle = device.open().unwrap();
        let mut buf = [0u8; 8];

        assert_eq!(
            handle.read_interrupt(0x81, &mut buf, Duration::from_millis(5)),
            Err(rusb::Error::Timeout)
        );

        device.push_input(&[1, 2, 3]);
        assert_eq!(
            handle.read_interrupt(0x81, &mut buf, Duration::from_millis(5)),
            Ok(3)
        );

        device.disconnect();
        assert_eq!(
            handle.read_interrupt(0x81, &mut buf, Duration::from_millis(5)),
            Err(rusb::Error::NoDevice)
        );
        assert_eq!(
            handle.write_interrupt(0x01, &buf, Duration::from_millis(5)),
            Err(rusb::Error::NoDevice)
        );
    }

    #[test]
    fn test_config_grouping() {
        let config = config_of(vec![
            class_interface(0, 0, 0xff, 71, 208),
            class_interface(1, 0, 0xff, 71, 208),
            class_interface(1, 1, 0xff, 71, 208),
        ]);
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.interfaces[1].alt_settings.len(), 2);
        assert_eq!(config.alt_settings().count(), 3);
    }
}
