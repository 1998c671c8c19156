//! Common utilities for usbhid
//!
//! This crate provides functionality shared by the HID engine and its
//! tooling: the bounded report channel that connects a device's read
//! pipeline to its readers, logging setup, error handling and test helpers.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{MAX_QUEUED_REPORTS, Received, ReportChannel, Wait};
pub use error::{Error, Result};
pub use logging::{setup_logging, validate_filter};
