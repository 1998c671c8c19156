//! Device path strings
//!
//! A path identifies one interface of one device by its position in the USB
//! topology: `<bus>-<port1>[.<port2>...]:<config>.<interface>`, all decimal.
//! Because it is derived from physical ports rather than the device address,
//! the same interface keeps the same path across repeated enumerations.

use crate::error::{ProtocolError, Result};
use std::fmt;
use std::str::FromStr;

/// USB 3 allows at most 7 tiers of ports below the root
pub const MAX_PORT_DEPTH: usize = 7;

/// Longest possible path: "000-000.000.000.000.000.000.000:000.000"
pub const MAX_PATH_LEN: usize = 39;

/// Parsed form of a device path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevicePath {
    pub bus: u8,
    pub ports: Vec<u8>,
    pub config: u8,
    pub interface: u8,
}

impl DevicePath {
    pub fn new(bus: u8, ports: &[u8], config: u8, interface: u8) -> Self {
        Self {
            bus,
            ports: ports.to_vec(),
            config,
            interface,
        }
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_path(self.bus, &self.ports, self.config, self.interface))
    }
}

/// Build the path string for an interface
///
/// Returns an empty string when `ports` is empty: a device whose port chain
/// cannot be read has no stable identity.
pub fn format_path(bus: u8, ports: &[u8], config: u8, interface: u8) -> String {
    let Some((first, rest)) = ports.split_first() else {
        return String::new();
    };

    let mut path = format!("{}-{}", bus, first);
    for port in rest.iter().take(MAX_PORT_DEPTH - 1) {
        path.push('.');
        path.push_str(&port.to_string());
    }
    path.push_str(&format!(":{}.{}", config, interface));
    path
}

impl FromStr for DevicePath {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ProtocolError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        let (location, selector) = s.split_once(':').ok_or_else(|| invalid("missing ':'"))?;
        let (bus, ports) = location
            .split_once('-')
            .ok_or_else(|| invalid("missing '-' after bus number"))?;
        let (config, interface) = selector
            .split_once('.')
            .ok_or_else(|| invalid("expected <config>.<interface>"))?;

        let number = |field: &str, what: &str| {
            field
                .parse::<u8>()
                .map_err(|_| invalid(&format!("invalid {} '{}'", what, field)))
        };

        let ports = ports
            .split('.')
            .map(|p| number(p, "port"))
            .collect::<Result<Vec<u8>>>()?;
        if ports.len() > MAX_PORT_DEPTH {
            return Err(invalid("port chain too deep"));
        }

        Ok(DevicePath {
            bus: number(bus, "bus")?,
            ports,
            config: number(config, "configuration")?,
            interface: number(interface, "interface")?,
        })
    }
}
