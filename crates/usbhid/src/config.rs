//! Runtime configuration
//!
//! Settings are read from `$CONFIG/usbhid/config.toml` when present. Every
//! field has a default, so a missing file or a partial file is fine.

use crate::error::{HidError, HidResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "HidConfig::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub usb: UsbSettings,
    #[serde(default)]
    pub strings: StringSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Detach an active kernel driver before claiming an interface, and
    /// reattach it on release
    #[serde(default = "UsbSettings::default_detach_kernel_driver")]
    pub detach_kernel_driver: bool,
    /// Claim each interface during enumeration to read its report
    /// descriptor and fill in Usage Page / Usage. Briefly steals the
    /// interface from the kernel driver, so it is off by default.
    #[serde(default)]
    pub invasive_usage: bool,
    /// Timeout of each interrupt-IN transfer in the read pipeline; bounds
    /// how long closing a device waits for the pipeline to stop
    #[serde(default = "UsbSettings::default_interrupt_poll_ms")]
    pub interrupt_poll_ms: u64,
    /// Timeout for output and feature report transfers
    #[serde(default = "UsbSettings::default_transfer_timeout_ms")]
    pub transfer_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringSettings {
    /// Locale used to pick the string descriptor language (e.g. "de_DE").
    /// Falls back to LC_ALL, LC_CTYPE and LANG.
    #[serde(default)]
    pub locale: Option<String>,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            usb: UsbSettings::default(),
            strings: StringSettings::default(),
        }
    }
}

impl Default for UsbSettings {
    fn default() -> Self {
        Self {
            detach_kernel_driver: Self::default_detach_kernel_driver(),
            invasive_usage: false,
            interrupt_poll_ms: Self::default_interrupt_poll_ms(),
            transfer_timeout_ms: Self::default_transfer_timeout_ms(),
        }
    }
}

impl UsbSettings {
    fn default_detach_kernel_driver() -> bool {
        // FreeBSD's libusb has no kernel driver detach
        !cfg!(target_os = "freebsd")
    }

    fn default_interrupt_poll_ms() -> u64 {
        100
    }

    fn default_transfer_timeout_ms() -> u64 {
        1000
    }

    /// Interrupt-IN poll timeout as a Duration
    pub fn interrupt_poll(&self) -> Duration {
        Duration::from_millis(self.interrupt_poll_ms)
    }

    /// Output/feature transfer timeout as a Duration
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

impl HidConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }

    /// Load configuration from the specified path
    ///
    /// Without a path, the default location is tried.
    pub fn load(path: Option<PathBuf>) -> HidResult<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Err(HidError::Config(format!(
                        "No configuration file at {}",
                        default.display()
                    )));
                }
                default
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            HidError::Config(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config: HidConfig = toml::from_str(&content).map_err(|e| {
            HidError::Config(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> HidResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HidError::Config(format!("Failed to serialize configuration: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbhid").join("config.toml")
        } else {
            PathBuf::from(".config/usbhid/config.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> HidResult<()> {
        hid_common::validate_filter(&self.log_level)
            .map_err(|e| HidError::Config(e.to_string()))?;

        if self.usb.interrupt_poll_ms == 0 {
            return Err(HidError::Config(
                "usb.interrupt_poll_ms must be greater than 0".to_string(),
            ));
        }
        if self.usb.transfer_timeout_ms == 0 {
            return Err(HidError::Config(
                "usb.transfer_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if let Some(locale) = &self.strings.locale {
            let valid = !locale.is_empty()
                && locale
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@'));
            if !valid {
                return Err(HidError::Config(format!(
                    "Invalid locale '{}', expected something like 'en_US.UTF-8'",
                    locale
                )));
            }
        }

        Ok(())
    }
}

/// Load configuration from a path string, expanding `~`
pub fn load_config(path: &str) -> HidResult<HidConfig> {
    let expanded = shellexpand::tilde(path);
    HidConfig::load(Some(PathBuf::from(expanded.as_ref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HidConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.usb.invasive_usage);
        assert_eq!(config.usb.interrupt_poll(), Duration::from_millis(100));
        assert_eq!(config.usb.transfer_timeout(), Duration::from_secs(1));
        assert!(config.strings.locale.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: HidConfig = toml::from_str(
            r#"
            [usb]
            invasive_usage = true
            "#,
        )
        .unwrap();

        assert!(config.usb.invasive_usage);
        assert_eq!(config.usb.interrupt_poll_ms, 100);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = HidConfig::default();
        config.usb.interrupt_poll_ms = 0;
        assert!(config.validate().is_err());

        let mut config = HidConfig::default();
        config.usb.transfer_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_locale() {
        let mut config = HidConfig::default();
        config.strings.locale = Some("de_DE.UTF-8".to_string());
        assert!(config.validate().is_ok());

        config.strings.locale = Some("de DE".to_string());
        assert!(config.validate().is_err());

        config.strings.locale = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = HidConfig::default();
        config.log_level = "usbhid=trace".to_string();
        assert!(config.validate().is_ok());

        config.log_level = "usbhid=[".to_string();
        assert!(config.validate().is_err());
    }
}
