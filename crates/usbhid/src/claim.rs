//! Scoped interface claims
//!
//! [`ClaimedInterface`] detaches the kernel driver (if asked and one is
//! bound), claims the interface, and undoes both when dropped. Every path
//! that claims an interface goes through it, so a release can never be
//! forgotten on an early return.

use crate::transport::{UsbHandle, UsbResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// An interface claimed on an open handle
pub struct ClaimedInterface {
    handle: Arc<dyn UsbHandle>,
    interface: u8,
    driver_detached: bool,
}

impl ClaimedInterface {
    /// Detach the kernel driver if requested and active, then claim
    ///
    /// If the claim fails, a driver detached here is reattached before the
    /// error is returned.
    pub fn acquire(
        mut handle: Box<dyn UsbHandle>,
        interface: u8,
        detach_kernel_driver: bool,
    ) -> UsbResult<Self> {
        let mut driver_detached = false;

        if detach_kernel_driver {
            match handle.kernel_driver_active(interface) {
                Ok(true) => match handle.detach_kernel_driver(interface) {
                    Ok(()) => {
                        debug!("Detached kernel driver from interface {}", interface);
                        driver_detached = true;
                    }
                    Err(e) => {
                        warn!(
                            "Failed to detach kernel driver from interface {}: {}",
                            interface, e
                        );
                    }
                },
                Ok(false) => {
                    debug!("No kernel driver active on interface {}", interface);
                }
                Err(e) => {
                    debug!(
                        "Could not check kernel driver status for interface {}: {}",
                        interface, e
                    );
                }
            }
        }

        if let Err(e) = handle.claim_interface(interface) {
            warn!("Failed to claim interface {}: {}", interface, e);
            if driver_detached {
                reattach(handle.as_mut(), interface);
            }
            return Err(e);
        }

        debug!("Claimed interface {}", interface);
        Ok(Self {
            handle: Arc::from(handle),
            interface,
            driver_detached,
        })
    }

    /// Shared handle for transfers
    pub fn handle(&self) -> &Arc<dyn UsbHandle> {
        &self.handle
    }

    /// Exclusive access to the handle, available while no other clone of it exists
    pub fn handle_mut(&mut self) -> Option<&mut (dyn UsbHandle + 'static)> {
        Arc::get_mut(&mut self.handle)
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    /// Whether a kernel driver was detached and will be reattached
    pub fn driver_detached(&self) -> bool {
        self.driver_detached
    }
}

impl Drop for ClaimedInterface {
    fn drop(&mut self) {
        let interface = self.interface;
        let detached = self.driver_detached;

        let Some(handle) = Arc::get_mut(&mut self.handle) else {
            // Only reachable if a pipeline thread outlived its session.
            warn!(
                "Handle for interface {} still shared, skipping release",
                interface
            );
            return;
        };

        match handle.release_interface(interface) {
            Ok(()) => debug!("Released interface {}", interface),
            Err(e) => warn!("Failed to release interface {}: {}", interface, e),
        }

        if detached {
            reattach(handle, interface);
        }
    }
}

fn reattach(handle: &mut dyn UsbHandle, interface: u8) {
    match handle.attach_kernel_driver(interface) {
        Ok(()) => debug!("Reattached kernel driver to interface {}", interface),
        Err(e) => warn!(
            "Failed to reattach kernel driver to interface {}: {}",
            interface, e
        ),
    }
}
