//! Connection defaults.
//!
//! Finding and reading the config file is up to the caller, this only
//! describes what goes in it.
//!
//! # Example
//!
//! ```toml
//! alt_usb = true
//! overdrive = false
//! ds2404_compliance = false
//! flexible_timing = true
//! ```
use crate::error::ConfigError;
use serde::Deserialize;

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Defaults applied to every new [`crate::connection::Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Use the alternate USB timing set.
    ///
    /// Slew rate 3, write one low time 10µs, data sample offset 8µs when set.
    /// Slew rate 5, write one low time 12µs, data sample offset 7µs otherwise.
    pub alt_usb: bool,

    /// Request overdrive speed on new connections.
    pub overdrive: bool,

    /// Extra delays for DS2404 compatibility.
    pub ds2404_compliance: bool,

    /// Flexible timing on USB adapters.
    pub flexible_timing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alt_usb: true,
            overdrive: false,
            ds2404_compliance: false,
            flexible_timing: true,
        }
    }
}

impl Config {
    /// Parse a TOML config. Missing keys take their defaults.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML config file.
    #[cfg(feature = "toml")]
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }
}
