//! Background read pipeline
//!
//! One `hid-read` thread per open device keeps an interrupt-IN transfer
//! outstanding and feeds completed reports into the device's
//! [`ReportChannel`]. Each transfer is bounded by the poll timeout, which
//! is how often the thread notices a stop request.

use crate::error::{HidError, HidResult};
use crate::transport::{UsbHandle, is_fatal};
use hid_common::ReportChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Pause after a transient transfer error before resubmitting
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Handle to a running read thread; dropping it stops and joins the thread
pub struct ReadPipeline {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReadPipeline {
    /// Spawn the read thread and wait until it is running
    pub fn start(
        handle: Arc<dyn UsbHandle>,
        endpoint: u8,
        max_packet_size: u16,
        poll_timeout: Duration,
        reports: Arc<ReportChannel>,
    ) -> HidResult<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let barrier = Arc::new(Barrier::new(2));

        let thread = {
            let shutdown = Arc::clone(&shutdown);
            let barrier = Arc::clone(&barrier);
            thread::Builder::new()
                .name("hid-read".to_string())
                .spawn(move || {
                    barrier.wait();
                    read_loop(
                        handle.as_ref(),
                        endpoint,
                        max_packet_size,
                        poll_timeout,
                        &reports,
                        &shutdown,
                    );
                    reports.close();
                })
                .map_err(|e| HidError::Thread(format!("Failed to spawn read thread: {}", e)))?
        };

        barrier.wait();
        debug!("Read pipeline running on endpoint 0x{:02x}", endpoint);

        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Whether the read thread is still polling
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Ask the thread to stop and wait for it
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Read thread panicked");
            } else {
                debug!("Read pipeline stopped");
            }
        }
    }
}

impl Drop for ReadPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(
    handle: &dyn UsbHandle,
    endpoint: u8,
    max_packet_size: u16,
    poll_timeout: Duration,
    reports: &ReportChannel,
    shutdown: &AtomicBool,
) {
    let mut buf = vec![0u8; max_packet_size.max(1) as usize];

    while !shutdown.load(Ordering::SeqCst) {
        match handle.read_interrupt(endpoint, &mut buf, poll_timeout) {
            Ok(len) => {
                trace!("Endpoint 0x{:02x}: {} byte report", endpoint, len);
                reports.push(buf[..len].to_vec());
            }
            Err(rusb::Error::Timeout) => {}
            Err(rusb::Error::NoDevice) => {
                info!("Device removed, stopping reads on endpoint 0x{:02x}", endpoint);
                return;
            }
            Err(e) if is_fatal(e) => {
                warn!(
                    "Interrupt transfer on endpoint 0x{:02x} failed: {}, stopping reads",
                    endpoint, e
                );
                return;
            }
            Err(e) => {
                debug!(
                    "Interrupt transfer on endpoint 0x{:02x} failed: {}, retrying",
                    endpoint, e
                );
                thread::sleep(RETRY_BACKOFF);
            }
        }
    }
}
