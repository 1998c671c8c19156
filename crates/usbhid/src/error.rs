//! Error types for the HID engine

use thiserror::Error;

/// Errors returned by HID operations
///
/// Transport failures leave an open device usable; only
/// [`HidError::Disconnected`] means the read side is gone for good.
#[derive(Debug, Error)]
pub enum HidError {
    /// Transfer, claim or descriptor failure reported by libusb
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),

    /// No HID interface has this path
    #[error("Device not found: {path}")]
    DeviceNotFound { path: String },

    /// Enumeration found nothing matching the ids (and serial)
    #[error("No HID device matching {vendor_id:04x}:{product_id:04x}")]
    NoMatchingDevice { vendor_id: u16, product_id: u16 },

    /// A wrapped system device exposes no usable HID interface
    #[error("Device has no HID interface")]
    NoHidInterface,

    /// The device was removed, or it has no input endpoint, and no reports remain
    #[error("Device disconnected")]
    Disconnected,

    /// A string descriptor could not be read or decoded
    #[error("String descriptor {index} unavailable")]
    StringUnavailable { index: u8 },

    /// The caller passed data the operation cannot use
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// Configuration could not be loaded, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The read pipeline thread could not be started
    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<hid_protocol::ProtocolError> for HidError {
    fn from(err: hid_protocol::ProtocolError) -> Self {
        HidError::Config(err.to_string())
    }
}

/// Type alias for HID results
pub type HidResult<T> = std::result::Result<T, HidError>;
