//! The library context
//!
//! [`HidApi`] owns the USB backend, the runtime configuration and the
//! manufacturer/product string cache. Creating one initializes the library;
//! dropping the last clone (or calling [`HidApi::exit`]) tears it down.
//! Open devices keep the context alive until they are closed.

use crate::config::HidConfig;
use crate::device::HidDevice;
use crate::enumerate::{self, device_config, hid_interfaces};
use crate::error::{HidError, HidResult};
use crate::identity::{StringCache, preferred_language, resolve_path};
use crate::rusb_backend::RusbBackend;
use crate::transport::UsbBackend;
use hid_protocol::DeviceInfo;
use hid_protocol::types::CLASS_HID;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State shared between the context and every device opened from it
pub(crate) struct Shared {
    pub(crate) backend: Arc<dyn UsbBackend>,
    pub(crate) strings: StringCache,
    pub(crate) config: HidConfig,
    /// String descriptor language derived from the locale, if known
    pub(crate) language: Option<u16>,
}

/// Entry point for discovering and opening HID devices
#[derive(Clone)]
pub struct HidApi {
    shared: Arc<Shared>,
}

impl HidApi {
    /// Initialize with libusb and the configuration file, if any
    pub fn new() -> HidResult<Self> {
        Self::with_config(HidConfig::load_or_default())
    }

    /// Initialize with libusb and explicit settings
    pub fn with_config(config: HidConfig) -> HidResult<Self> {
        config.validate()?;
        let backend = RusbBackend::new()?;
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// Initialize on top of any USB backend
    pub fn with_backend(backend: Arc<dyn UsbBackend>, config: HidConfig) -> Self {
        let language = preferred_language(config.strings.locale.as_deref());
        debug!("Preferred string language: {:04x?}", language);

        Self {
            shared: Arc::new(Shared {
                backend,
                strings: StringCache::new(),
                config,
                language,
            }),
        }
    }

    /// Settings this context was created with
    pub fn config(&self) -> &HidConfig {
        &self.shared.config
    }

    /// Number of VID/PID pairs with cached strings
    pub fn string_cache_len(&self) -> usize {
        self.shared.strings.len()
    }

    /// List HID interfaces; a zero id matches any device
    pub fn enumerate(&self, vendor_id: u16, product_id: u16) -> HidResult<Vec<DeviceInfo>> {
        enumerate::enumerate(&self.shared, vendor_id, product_id)
    }

    /// Open the first interface matching the ids and, if given, the serial number
    pub fn open(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&str>,
    ) -> HidResult<HidDevice> {
        let path = self
            .enumerate(vendor_id, product_id)?
            .into_iter()
            .find(|info| {
                info.vendor_id == vendor_id
                    && info.product_id == product_id
                    && serial_number
                        .is_none_or(|serial| info.serial_number.as_deref() == Some(serial))
            })
            .map(|info| info.path)
            .ok_or(HidError::NoMatchingDevice {
                vendor_id,
                product_id,
            })?;

        self.open_path(&path)
    }

    /// Open the interface at `path`
    ///
    /// Every attached device is searched; deny-listed devices can still be
    /// opened by path.
    pub fn open_path(&self, path: &str) -> HidResult<HidDevice> {
        let not_found = || HidError::DeviceNotFound {
            path: path.to_string(),
        };
        if path.is_empty() {
            return Err(not_found());
        }

        let mut last_error = None;

        for device in self.shared.backend.devices()? {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            let Some(config) = device_config(device.as_ref()) else {
                continue;
            };

            for interface in hid_interfaces(descriptor.vendor_id, &config) {
                if resolve_path(device.as_ref(), config.number, interface.interface_number) != path
                {
                    continue;
                }

                let handle = match device.open() {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!("Can't open {}: {}", path, e);
                        last_error = Some(HidError::Usb(e));
                        break;
                    }
                };

                match HidDevice::initialize(
                    Arc::clone(&self.shared),
                    handle,
                    &descriptor,
                    interface,
                    &config,
                    path.to_string(),
                ) {
                    Ok(session) => return Ok(session),
                    Err(e) => {
                        warn!("Can't initialize {}: {}", path, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(not_found))
    }

    /// Take over a platform device handle (a file descriptor on Unix)
    ///
    /// Uses `interface` if given, otherwise the first HID interface.
    pub fn wrap_sys_device(&self, sys_dev: isize, interface: Option<u8>) -> HidResult<HidDevice> {
        let handle = self.shared.backend.wrap_sys_device(sys_dev)?;
        let device = handle.device();
        let descriptor = device.device_descriptor()?;
        let config = device_config(device.as_ref()).ok_or(HidError::NoHidInterface)?;

        let selected = config
            .alt_settings()
            .find(|alt| {
                alt.class_code == CLASS_HID
                    && interface.is_none_or(|number| alt.interface_number == number)
            })
            .ok_or(HidError::NoHidInterface)?;

        let path = resolve_path(device.as_ref(), config.number, selected.interface_number);
        HidDevice::initialize(
            Arc::clone(&self.shared),
            handle,
            &descriptor,
            selected,
            &config,
            path,
        )
    }

    /// Release the context: the string cache is emptied now, the backend
    /// once the last open device is closed
    pub fn exit(self) {
        self.shared.strings.clear();
        info!("HID context released");
    }
}
