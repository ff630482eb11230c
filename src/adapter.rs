//! Bus adapter capabilities.
//!
//! Every adapter implements [`Adapter::detect`]. Everything else is optional,
//! the provided methods fail with [`AdapterError::NotSupported`] and callers
//! must treat that as a hard failure, never as a successful no-op.
//!
//! Adapters are installed on a connection with
//! [`Connection::attach`](crate::connection::Connection::attach), which runs
//! `detect` once. Callers normally go through the wrappers on
//! [`Connection`], which keep the bus statistics up to date.
use crate::{connection::Connection, error::AdapterError};
use bitflags::bitflags;
use std::{fmt, time::Duration};

pub mod external;

pub use external::External;

pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

/// Identity of an adapter.
///
/// The discriminant is what the `settings/version` property reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum AdapterKind {
    #[default]
    Unknown = 0,
    /// Passive serial
    Ds9097 = 1,
    /// Parallel port
    Ds1410 = 2,
    /// Serial, DS2480B based
    Ds9097U = 4,
    /// LinkHub
    Link = 7,
    /// USB, DS2490 based
    Ds9490 = 8,
    /// Remote owserver
    Server = 9,
    /// HA7Net, over TCP
    Ha7Net = 10,
    Fake = 11,
    Mock = 12,
    /// I2C, DS2482 based
    Ds2482 = 13,
    /// Devices provided from outside the bus code
    External = 14,
}

impl AdapterKind {
    pub fn code(self) -> u32 {
        self as u32
    }
}

bitflags! {
    /// Adapter feature flags.
    pub struct AdapterFlags: u32 {
        /// Supports overdrive speed
        const OVERDRIVE = 1;

        /// Uses DS2409 path selection
        const PATH_2409 = 2;

        /// Can read a whole directory in one go
        const DIR_GULP = 4;

        /// Supports bundling several primitives per transaction
        const BUNDLE = 8;

        /// Presence is known from the directory listing
        const DIRBLOB_PRESENCE = 16;

        /// No extra delay needed for DS2404
        const NO_2404_DELAY = 32;
    }
}

impl Default for AdapterFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// A 64-bit 1-Wire ROM id.
///
/// Family code first, CRC last.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RomId(pub [u8; 8]);

impl RomId {
    pub fn family(&self) -> u8 {
        self.0[0]
    }
}

impl fmt::Debug for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for RomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}.", self.0[0])?;
        for b in &self.0[1..7] {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Result of a bus reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    /// At least one device answered.
    Presence,

    /// Nothing on the bus.
    Empty,

    /// Bus is shorted.
    Short,
}

/// State carried between [`Adapter::next_both`] calls.
#[derive(Debug, Clone, Default)]
pub struct Search {
    /// Last ROM found.
    pub rom: RomId,

    /// Bit position of the last unresolved branch.
    pub last_discrepancy: Option<u8>,

    /// The previous step found the last device.
    pub last_device: bool,

    /// Only find devices in an alarm state.
    pub alarm: bool,
}

/// Optional bus primitives of an adapter.
pub trait Adapter: Send {
    /// Identify the adapter and configure `conn` for it.
    ///
    /// On success this must set the connection identity with
    /// [`Connection::set_identity`], and may set flags and the bundling
    /// length. The connection resets those to empty and `1` beforehand.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::NotPresent`] if there is no such adapter
    /// - Any hardware error
    fn detect(&mut self, conn: &mut Connection) -> Result<()>;

    /// Reset the bus.
    fn reset(&mut self) -> Result<Reset> {
        Err(AdapterError::NotSupported)
    }

    /// Find the next ROM in a search. [`None`] when the search is done.
    fn next_both(&mut self, _search: &mut Search) -> Result<Option<RomId>> {
        Err(AdapterError::NotSupported)
    }

    /// Send `byte` and hold strong pullup for `delay`. Returns the byte read
    /// back.
    fn power_byte(&mut self, _byte: u8, _delay: Duration) -> Result<u8> {
        Err(AdapterError::NotSupported)
    }

    /// Send a 12V programming pulse.
    fn program_pulse(&mut self) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// Send `data`, replacing it with what was read back.
    fn sendback_data(&mut self, _data: &mut [u8]) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// Like [`Adapter::sendback_data`], one bit per byte.
    fn sendback_bits(&mut self, _bits: &mut [u8]) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// Address `rom`, or every device if [`None`].
    fn select(&mut self, _rom: Option<&RomId>) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// [`Adapter::select`] then [`Adapter::sendback_data`] in one transaction.
    fn select_and_sendback(&mut self, _rom: Option<&RomId>, _data: &mut [u8]) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// Re-establish a lost adapter. May update `conn` like
    /// [`Adapter::detect`].
    fn reconnect(&mut self, _conn: &mut Connection) -> Result<()> {
        Err(AdapterError::NotSupported)
    }

    /// Release the adapter.
    fn close(&mut self) -> Result<()> {
        Err(AdapterError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rom_display() {
        let rom = RomId([0x10, 0x67, 0xC6, 0x69, 0x73, 0x51, 0xFF, 0x8D]);
        assert_eq!(rom.to_string(), "10.67C6697351FF");
        assert_eq!(rom.family(), 0x10);
    }

    #[test]
    fn kind_codes() {
        assert_eq!(AdapterKind::Unknown.code(), 0);
        assert_eq!(AdapterKind::Ds9490.code(), 8);
        assert_eq!(AdapterKind::External.code(), 14);
    }
}
