//! Open HID device sessions
//!
//! A [`HidDevice`] owns one claimed interface, the read pipeline that
//! drains its interrupt-IN endpoint, and the queue of reports waiting to be
//! read. Every method takes `&self`; a session can be shared between
//! threads, and concurrent readers each take one report per call.

use crate::api::Shared;
use crate::claim::ClaimedInterface;
use crate::enumerate;
use crate::error::{HidError, HidResult};
use crate::identity::{WideChar, fill_wide, read_string};
use crate::pipeline::ReadPipeline;
use crate::quirks;
use crate::transport::{UsbHandle, UsbResult};
use hid_common::{Received, ReportChannel, Wait};
use hid_protocol::types::{
    DT_REPORT, HID_GET_REPORT, HID_SET_REPORT, MAX_REPORT_DESCRIPTOR_SIZE,
    REQUEST_GET_DESCRIPTOR, request_type,
};
use hid_protocol::{
    ConfigDescriptor, DeviceInfo, InterfaceDescriptor, QuirkFlags, ReportType,
    UsbDeviceDescriptor, find_first_usage, report_descriptor_length,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

const REPORT_DESCRIPTOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetch an interface's report descriptor, at most `declared_len` bytes
/// (capped at [`MAX_REPORT_DESCRIPTOR_SIZE`])
pub(crate) fn read_report_descriptor(
    handle: &dyn UsbHandle,
    interface: u8,
    declared_len: u16,
) -> UsbResult<Vec<u8>> {
    let mut buf = vec![0u8; declared_len.min(MAX_REPORT_DESCRIPTOR_SIZE) as usize];
    let len = handle.read_control(
        request_type::STANDARD_INTERFACE_IN,
        REQUEST_GET_DESCRIPTOR,
        (DT_REPORT as u16) << 8,
        interface as u16,
        &mut buf,
        REPORT_DESCRIPTOR_TIMEOUT,
    )?;
    buf.truncate(len);
    Ok(buf)
}

/// An open HID interface
pub struct HidDevice {
    pipeline: Option<ReadPipeline>,
    claim: ClaimedInterface,
    reports: Arc<ReportChannel>,
    shared: Arc<Shared>,
    path: String,
    descriptor: UsbDeviceDescriptor,
    interface: InterfaceDescriptor,
    report_descriptor_size: u16,
    output_endpoint: Option<u8>,
    quirks: QuirkFlags,
    blocking: AtomicBool,
    info: OnceLock<DeviceInfo>,
}

impl HidDevice {
    /// Claim `interface` on a freshly opened handle and start reading
    pub(crate) fn initialize(
        shared: Arc<Shared>,
        handle: Box<dyn UsbHandle>,
        descriptor: &UsbDeviceDescriptor,
        interface: &InterfaceDescriptor,
        config: &ConfigDescriptor,
        path: String,
    ) -> HidResult<Self> {
        let (vid, pid) = (descriptor.vendor_id, descriptor.product_id);
        let number = interface.interface_number;

        let mut claim =
            ClaimedInterface::acquire(handle, number, shared.config.usb.detach_kernel_driver)?;

        let quirks = match claim.handle_mut() {
            Some(handle) => quirks::detect_and_init(handle, vid, pid, interface, config),
            None => hid_protocol::quirks::product_quirks(vid, pid),
        };

        let output_endpoint = interface.interrupt_out().map(|ep| ep.address);
        let reports = Arc::new(ReportChannel::new());

        let pipeline = match interface.interrupt_in() {
            Some(ep) => Some(ReadPipeline::start(
                Arc::clone(claim.handle()),
                ep.address,
                ep.max_packet_size,
                shared.config.usb.interrupt_poll(),
                Arc::clone(&reports),
            )?),
            None => {
                warn!("Interface {} of {} has no interrupt-IN endpoint", number, path);
                reports.close();
                None
            }
        };

        info!(
            "Opened {:04x}:{:04x} at {} (interface {})",
            vid, pid, path, number
        );

        Ok(Self {
            pipeline,
            claim,
            reports,
            shared,
            path,
            descriptor: descriptor.clone(),
            report_descriptor_size: report_descriptor_length(&interface.extra),
            interface: interface.clone(),
            output_endpoint,
            quirks,
            blocking: AtomicBool::new(true),
            info: OnceLock::new(),
        })
    }

    fn handle(&self) -> &dyn UsbHandle {
        self.claim.handle().as_ref()
    }

    fn transfer_timeout(&self) -> Duration {
        self.shared.config.usb.transfer_timeout()
    }

    /// Path this session was opened at
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Quirks in effect for this device
    pub fn quirks(&self) -> QuirkFlags {
        self.quirks
    }

    /// Choose whether [`read`](Self::read) waits for a report
    pub fn set_blocking_mode(&self, blocking: bool) {
        self.blocking.store(blocking, Ordering::Relaxed);
    }

    /// Read one input report using the current blocking mode
    pub fn read(&self, buf: &mut [u8]) -> HidResult<usize> {
        let timeout_ms = if self.blocking.load(Ordering::Relaxed) {
            -1
        } else {
            0
        };
        self.read_timeout(buf, timeout_ms)
    }

    /// Read one input report, waiting up to `timeout_ms`
    ///
    /// A negative timeout waits forever and zero never waits. The report is
    /// truncated to `buf`. Returns `Ok(0)` if nothing arrived in time and
    /// [`HidError::Disconnected`] once the pipeline has stopped and the
    /// queue is empty.
    pub fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> HidResult<usize> {
        match self.reports.recv(Wait::from_millis(timeout_ms)) {
            Received::Report(report) => {
                let len = report.len().min(buf.len());
                buf[..len].copy_from_slice(&report[..len]);
                trace!("Read {} of {} byte report", len, report.len());
                Ok(len)
            }
            Received::TimedOut => Ok(0),
            Received::Disconnected => Err(HidError::Disconnected),
        }
    }

    /// Send an output report; `data[0]` is the report id
    ///
    /// Returns the number of bytes accepted, counting a stripped report id.
    pub fn write(&self, data: &[u8]) -> HidResult<usize> {
        let Some(&report_id) = data.first() else {
            return Err(HidError::InvalidInput("empty output report"));
        };

        let strip = (!self.quirks.no_skip_output_report_id && report_id == 0)
            || self.quirks.skip_output_report_id;
        let payload = if strip { &data[1..] } else { data };

        let endpoint = self
            .output_endpoint
            .filter(|_| !self.quirks.no_output_reports_on_interrupt_ep);

        let written = match endpoint {
            Some(ep) => self
                .handle()
                .write_interrupt(ep, payload, self.transfer_timeout())?,
            None => self.handle().write_control(
                request_type::CLASS_INTERFACE_OUT,
                HID_SET_REPORT,
                ReportType::Output.w_value(report_id),
                self.interface.interface_number as u16,
                payload,
                self.transfer_timeout(),
            )?,
        };

        debug!(
            "Wrote output report {} ({} bytes) to {}",
            report_id,
            written,
            self.path
        );
        Ok(written + strip as usize)
    }

    /// Send a feature report; `data[0]` is the report id
    pub fn send_feature_report(&self, data: &[u8]) -> HidResult<usize> {
        let Some(&report_id) = data.first() else {
            return Err(HidError::InvalidInput("empty feature report"));
        };
        let strip = report_id == 0;
        let payload = if strip { &data[1..] } else { data };

        self.handle().write_control(
            request_type::CLASS_INTERFACE_OUT,
            HID_SET_REPORT,
            ReportType::Feature.w_value(report_id),
            self.interface.interface_number as u16,
            payload,
            self.transfer_timeout(),
        )?;
        Ok(data.len())
    }

    /// Fetch a feature report; set `buf[0]` to the report id first
    pub fn get_feature_report(&self, buf: &mut [u8]) -> HidResult<usize> {
        self.get_report(ReportType::Feature, buf)
    }

    /// Fetch an input report over the control pipe; set `buf[0]` to the
    /// report id first
    pub fn get_input_report(&self, buf: &mut [u8]) -> HidResult<usize> {
        self.get_report(ReportType::Input, buf)
    }

    fn get_report(&self, report_type: ReportType, buf: &mut [u8]) -> HidResult<usize> {
        let Some(&report_id) = buf.first() else {
            return Err(HidError::InvalidInput("empty report buffer"));
        };
        let strip = report_id == 0;
        let target = if strip { &mut buf[1..] } else { buf };

        let len = self.handle().read_control(
            request_type::CLASS_INTERFACE_IN,
            HID_GET_REPORT,
            report_type.w_value(report_id),
            self.interface.interface_number as u16,
            target,
            self.transfer_timeout(),
        )?;
        Ok(len + strip as usize)
    }

    /// Copy the report descriptor into `buf`, truncating if needed
    pub fn get_report_descriptor(&self, buf: &mut [u8]) -> HidResult<usize> {
        let descriptor = read_report_descriptor(
            self.handle(),
            self.interface.interface_number,
            self.report_descriptor_size,
        )?;
        let len = descriptor.len().min(buf.len());
        buf[..len].copy_from_slice(&descriptor[..len]);
        Ok(len)
    }

    fn string_at(&self, index: Option<u8>) -> HidResult<String> {
        let index = index.ok_or(HidError::StringUnavailable { index: 0 })?;
        self.get_indexed_string(index)
    }

    pub fn get_manufacturer_string(&self) -> HidResult<String> {
        self.string_at(self.descriptor.manufacturer_index)
    }

    pub fn get_product_string(&self) -> HidResult<String> {
        self.string_at(self.descriptor.product_index)
    }

    pub fn get_serial_number_string(&self) -> HidResult<String> {
        self.string_at(self.descriptor.serial_number_index)
    }

    /// Read string descriptor `index` in the negotiated language
    pub fn get_indexed_string(&self, index: u8) -> HidResult<String> {
        read_string(self.handle(), index, self.shared.language)
            .ok_or(HidError::StringUnavailable { index })
    }

    /// Read string descriptor `index` into a zero-terminated wide buffer
    ///
    /// Returns the number of characters written before the terminator.
    pub fn get_indexed_string_wide(&self, index: u8, buf: &mut [WideChar]) -> HidResult<usize> {
        if buf.is_empty() {
            return Err(HidError::InvalidInput("empty string buffer"));
        }
        let text = self.get_indexed_string(index)?;
        Ok(fill_wide(&text, buf))
    }

    /// Enumeration record for this session, built on first use
    ///
    /// Unlike [`HidApi::enumerate`](crate::HidApi::enumerate), Usage Page
    /// and Usage always come from the live report descriptor.
    pub fn get_device_info(&self) -> &DeviceInfo {
        self.info.get_or_init(|| {
            let handle = self.handle();
            let mut info = enumerate::device_info(
                &self.shared,
                self.path.clone(),
                Some(handle),
                &self.descriptor,
                &self.interface,
            );

            match read_report_descriptor(
                handle,
                self.interface.interface_number,
                self.report_descriptor_size,
            ) {
                Ok(descriptor) => {
                    let usage = find_first_usage(&descriptor).or_zero();
                    info.usage_page = usage.usage_page;
                    info.usage = usage.usage;
                }
                Err(e) => debug!("Can't read report descriptor of {}: {}", self.path, e),
            }
            info
        })
    }

    /// Input reports discarded because the queue was full
    pub fn dropped_reports(&self) -> u64 {
        self.reports.dropped()
    }

    /// Stop reading, release the interface and close the handle
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for HidDevice {
    fn drop(&mut self) {
        // The pipeline shares the handle; it has to be gone before the
        // claim can release the interface.
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
        info!(
            "Closed {} ({} report(s) still queued)",
            self.path,
            self.reports.len()
        );
    }
}
