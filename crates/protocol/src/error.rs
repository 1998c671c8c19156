//! Protocol error types

use thiserror::Error;

/// Errors raised while interpreting HID/USB data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A device path string did not follow `bus-ports:config.interface`
    #[error("Invalid device path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A vendor/product id was not a valid 16-bit hex number
    #[error("Invalid {name} '{value}', expected a 16-bit hex number")]
    InvalidId { name: &'static str, value: String },
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Parse a USB vendor or product id written in hex, with or without `0x`
pub fn parse_hex_id(value: &str, name: &'static str) -> Result<u16> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.is_empty() || digits.len() > 4 {
        return Err(ProtocolError::InvalidId {
            name,
            value: value.to_string(),
        });
    }

    u16::from_str_radix(digits, 16).map_err(|_| ProtocolError::InvalidId {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::InvalidPath {
            path: "bogus".to_string(),
            reason: "missing ':'".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("bogus"));
        assert!(msg.contains("missing ':'"));
    }

    #[test]
    fn test_parse_hex_id() {
        assert_eq!(parse_hex_id("0x045e", "VID"), Ok(0x045e));
        assert_eq!(parse_hex_id("045E", "VID"), Ok(0x045e));
        assert_eq!(parse_hex_id("0X1", "PID"), Ok(0x0001));
        assert!(parse_hex_id("0x", "VID").is_err());
        assert!(parse_hex_id("0x12345", "VID").is_err());
        assert!(parse_hex_id("0xGHIJ", "PID").is_err());
    }
}
