//! Device identity: paths and string descriptors
//!
//! Strings are requested in the language matching the process locale when
//! the device offers it, and in the device's first language otherwise.
//! Manufacturer and product strings are cached per VID/PID inside the
//! owning [`crate::HidApi`], since reading them costs several control
//! transfers per enumerated interface.

use crate::transport::{UsbDevice, UsbHandle};
use hid_protocol::types::{DT_STRING, REQUEST_GET_DESCRIPTOR, request_type};
use hid_protocol::{UsbDeviceDescriptor, format_path, quirks, usb_lang_for_locale};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

/// Timeout for string descriptor requests
const STRING_TIMEOUT: Duration = Duration::from_secs(1);

/// Buffer size for a string descriptor request
const STRING_BUF_LEN: usize = 512;

/// Buffer size for the language list (string descriptor 0)
const LANGUAGE_BUF_LEN: usize = 64;

/// The string cache grows by this many entries at a time
const CACHE_CHUNK: usize = 8;

/// Locale environment variables, highest priority first
const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

/// Wide character unit used by `get_indexed_string_wide`
#[cfg(windows)]
pub type WideChar = u16;
#[cfg(not(windows))]
pub type WideChar = u32;

/// Path of an interface, or an empty string when the port chain is unknown
pub fn resolve_path(device: &dyn UsbDevice, config: u8, interface: u8) -> String {
    match device.port_numbers() {
        Ok(ports) => format_path(device.bus_number(), &ports, config, interface),
        Err(e) => {
            debug!(
                "Could not read port numbers on bus {}: {}",
                device.bus_number(),
                e
            );
            String::new()
        }
    }
}

/// The locale string in effect: the override if given, else the environment
pub fn current_locale(locale_override: Option<&str>) -> Option<String> {
    if let Some(locale) = locale_override {
        return Some(locale.to_string());
    }

    LOCALE_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}

/// LANGID to prefer when reading strings
pub fn preferred_language(locale_override: Option<&str>) -> Option<u16> {
    current_locale(locale_override).and_then(|locale| usb_lang_for_locale(&locale))
}

/// Languages listed in string descriptor 0
pub fn supported_languages(handle: &dyn UsbHandle) -> Vec<u16> {
    let mut buf = [0u8; LANGUAGE_BUF_LEN];
    let len = match handle.read_control(
        request_type::STANDARD_DEVICE_IN,
        REQUEST_GET_DESCRIPTOR,
        (DT_STRING as u16) << 8,
        0,
        &mut buf,
        STRING_TIMEOUT,
    ) {
        Ok(len) => len,
        Err(e) => {
            trace!("Could not read language list: {}", e);
            return Vec::new();
        }
    };

    if len < 4 {
        return Vec::new();
    }

    buf[2..len]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Pick the language for string requests
///
/// Returns 0 when the device lists no languages at all.
pub fn negotiate_language(handle: &dyn UsbHandle, preferred: Option<u16>) -> u16 {
    let languages = supported_languages(handle);
    match preferred {
        Some(lang) if languages.contains(&lang) => lang,
        _ => languages.first().copied().unwrap_or(0),
    }
}

/// Read string descriptor `index` as text
///
/// Returns None if the request fails, the reply is shorter than its header,
/// or the payload is not valid UTF-16.
pub fn read_string(handle: &dyn UsbHandle, index: u8, preferred: Option<u16>) -> Option<String> {
    let lang = negotiate_language(handle, preferred);

    let mut buf = [0u8; STRING_BUF_LEN];
    let len = handle
        .read_control(
            request_type::STANDARD_DEVICE_IN,
            REQUEST_GET_DESCRIPTOR,
            ((DT_STRING as u16) << 8) | index as u16,
            lang,
            &mut buf,
            STRING_TIMEOUT,
        )
        .map_err(|e| trace!("String descriptor {} unavailable: {}", index, e))
        .ok()?;

    if len < 2 {
        return None;
    }

    let units: Vec<u16> = buf[2..len]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|_| debug!("String descriptor {} is not valid UTF-16", index))
        .ok()
}

/// Read the string at an optional index
pub fn read_optional_string(
    handle: &dyn UsbHandle,
    index: Option<u8>,
    preferred: Option<u16>,
) -> Option<String> {
    index.and_then(|i| read_string(handle, i, preferred))
}

/// Copy `text` into a fixed-size wide buffer, truncating as needed
///
/// The result is always zero-terminated. Returns the number of units
/// written before the terminator.
pub fn fill_wide(text: &str, buf: &mut [WideChar]) -> usize {
    let Some(capacity) = buf.len().checked_sub(1) else {
        return 0;
    };

    #[cfg(windows)]
    let units = text.encode_utf16();
    #[cfg(not(windows))]
    let units = text.chars().map(|c| c as u32);

    let mut written = 0;
    for (slot, unit) in buf.iter_mut().zip(units.take(capacity)) {
        *slot = unit;
        written += 1;
    }
    buf[written] = 0;
    written
}

/// Manufacturer and product strings of a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorProductStrings {
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    vendor_id: u16,
    product_id: u16,
    strings: VendorProductStrings,
}

/// Manufacturer/product strings keyed by VID/PID
///
/// Entries are never evicted; the cache lives as long as its context.
#[derive(Debug, Default)]
pub struct StringCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl StringCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached strings for a VID/PID
    pub fn lookup(&self, vendor_id: u16, product_id: u16) -> Option<VendorProductStrings> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.vendor_id == vendor_id && e.product_id == product_id)
            .map(|e| e.strings.clone())
    }

    /// Strings for a device, from the cache or read through `handle`
    ///
    /// Reading happens without holding the cache lock. Pairs that several
    /// products share are always read and never stored.
    pub fn resolve_vendor_product(
        &self,
        descriptor: &UsbDeviceDescriptor,
        handle: &dyn UsbHandle,
        preferred: Option<u16>,
    ) -> VendorProductStrings {
        let (vid, pid) = (descriptor.vendor_id, descriptor.product_id);
        let cacheable = quirks::strings_cacheable(vid, pid);

        if cacheable && let Some(strings) = self.lookup(vid, pid) {
            trace!("String cache hit for {:04x}:{:04x}", vid, pid);
            return strings;
        }

        let strings = VendorProductStrings {
            manufacturer: read_optional_string(handle, descriptor.manufacturer_index, preferred),
            product: read_optional_string(handle, descriptor.product_index, preferred),
        };

        if cacheable {
            self.insert(vid, pid, strings.clone());
        }
        strings
    }

    fn insert(&self, vendor_id: u16, product_id: u16, strings: VendorProductStrings) {
        let mut entries = self.entries.lock();
        if entries
            .iter()
            .any(|e| e.vendor_id == vendor_id && e.product_id == product_id)
        {
            return;
        }
        if entries.len() == entries.capacity() {
            entries.reserve_exact(CACHE_CHUNK);
        }
        entries.push(CacheEntry {
            vendor_id,
            product_id,
            strings,
        });
        debug!("Cached strings for {:04x}:{:04x}", vendor_id, product_id);
    }

    /// Number of cached VID/PID pairs
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and release the storage
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        entries.shrink_to_fit();
    }
}
