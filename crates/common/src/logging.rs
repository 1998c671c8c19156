//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Setup tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over `default_level`. Output goes to stderr so
/// it never mixes with report data written to stdout. Fails if a global
/// subscriber is already installed.
pub fn setup_logging(default_level: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| crate::Error::Logging(e.to_string()))?;

    Ok(())
}

/// Check a log level or filter directive without installing anything
pub fn validate_filter(filter: &str) -> crate::Result<()> {
    EnvFilter::try_new(filter)
        .map(|_| ())
        .map_err(|e| crate::Error::Config(format!("Invalid log filter '{}': {}", filter, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filter() {
        assert!(validate_filter("info").is_ok());
        assert!(validate_filter("usbhid=debug,warn").is_ok());
        assert!(validate_filter("usbhid=[").is_err());
    }
}
