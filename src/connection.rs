//! Per-adapter connection state.
//!
//! A [`Connection`] is owned by the bus management code. Property handlers
//! read it, and writes take `&mut Connection`, so whoever owns it decides how
//! concurrent access is serialized.
use crate::{
    adapter::{self, Adapter, AdapterFlags, AdapterKind, Reset, RomId, Search},
    config::Config,
    error::AdapterError,
    stats::{BusCounter, Registry},
};
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// How a connection talks to its adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusMode {
    #[default]
    Unknown,
    Serial,
    PassiveSerial,
    Parallel,
    Usb,
    I2c,
    Link,
    Ha7Net,
    Server,
    Fake,
    Mock,
    External,
}

/// Requested bus speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Speed {
    #[default]
    Slow,
    Flex,
    Overdrive,
}

/// Timing parameters of a DS2490 USB adapter, as stored in the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbTiming {
    /// Pulldown slew rate code, 0 to 7.
    pub pulldown_slew_rate: u8,

    /// Write one low time, in µs minus 8.
    pub write_one_low_time: u8,

    /// Data sample offset, in µs minus 3.
    pub data_sample_offset: u8,

    pub flextime: bool,
}

impl UsbTiming {
    /// Chip defaults for the alternate or standard timing set.
    pub fn new(alt_usb: bool) -> Self {
        if alt_usb {
            Self {
                pulldown_slew_rate: 3,
                write_one_low_time: 10 - 8,
                data_sample_offset: 8 - 3,
                flextime: true,
            }
        } else {
            Self {
                pulldown_slew_rate: 5,
                write_one_low_time: 12 - 8,
                data_sample_offset: 7 - 3,
                flextime: true,
            }
        }
    }
}

impl Default for UsbTiming {
    fn default() -> Self {
        Self::new(true)
    }
}

/// One adapter connection.
pub struct Connection {
    index: usize,
    address: String,
    kind: AdapterKind,
    adapter_name: Option<String>,
    bus_mode: BusMode,
    flags: AdapterFlags,
    bundling_length: usize,

    pub(crate) set_speed: Speed,
    pub(crate) changed_bus_settings: bool,
    pub(crate) ds2404_compliance: bool,
    pub(crate) usb: UsbTiming,

    stats: Arc<Registry>,
    adapter: Option<Box<dyn Adapter>>,
}

// Public
impl Connection {
    /// New connection `index` to the adapter at `address`, with default
    /// settings and no adapter attached.
    ///
    /// `index` selects this connection's row in `stats`.
    pub fn new(index: usize, address: &str, bus_mode: BusMode, stats: Arc<Registry>) -> Self {
        Self::with_config(index, address, bus_mode, stats, &Config::default())
    }

    /// Like [`Connection::new`], with settings taken from `config`.
    pub fn with_config(
        index: usize,
        address: &str,
        bus_mode: BusMode,
        stats: Arc<Registry>,
        config: &Config,
    ) -> Self {
        let mut usb = UsbTiming::new(config.alt_usb);
        usb.flextime = config.flexible_timing;
        Self {
            index,
            address: address.to_owned(),
            kind: AdapterKind::Unknown,
            adapter_name: None,
            bus_mode,
            flags: AdapterFlags::empty(),
            bundling_length: 1,
            set_speed: if config.overdrive {
                Speed::Overdrive
            } else {
                Speed::Slow
            },
            changed_bus_settings: false,
            ds2404_compliance: config.ds2404_compliance,
            usb,
            stats,
            adapter: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Device name or network address the adapter was opened with.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn kind(&self) -> AdapterKind {
        self.kind
    }

    /// Display name of the adapter, once detected.
    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter_name.as_deref()
    }

    pub fn bus_mode(&self) -> BusMode {
        self.bus_mode
    }

    pub fn set_bus_mode(&mut self, mode: BusMode) {
        self.bus_mode = mode;
    }

    pub fn flags(&self) -> AdapterFlags {
        self.flags
    }

    /// How many primitives may be bundled in one adapter transaction.
    pub fn bundling_length(&self) -> usize {
        self.bundling_length
    }

    pub fn speed(&self) -> Speed {
        self.set_speed
    }

    pub fn ds2404_compliance(&self) -> bool {
        self.ds2404_compliance
    }

    pub fn usb_timing(&self) -> &UsbTiming {
        &self.usb
    }

    /// Whether a settings write is waiting to be applied to the adapter.
    pub fn changed_bus_settings(&self) -> bool {
        self.changed_bus_settings
    }

    /// Clear and return the pending settings change.
    ///
    /// The bus code calls this before using the adapter, and reconfigures or
    /// resets it if `true`.
    pub fn take_changed_bus_settings(&mut self) -> bool {
        std::mem::take(&mut self.changed_bus_settings)
    }

    pub fn stats(&self) -> &Registry {
        &self.stats
    }

    /// Count `counter` against this connection.
    pub fn record(&self, counter: BusCounter) {
        self.stats.increment(self.index, counter)
    }

    /// Set the adapter identity. Called from [`Adapter::detect`].
    pub fn set_identity(&mut self, kind: AdapterKind, name: &str) {
        self.kind = kind;
        self.adapter_name = Some(name.to_owned());
    }

    pub fn set_flags(&mut self, flags: AdapterFlags) {
        self.flags = flags;
    }

    /// Zero is treated as `1`, no bundling.
    pub fn set_bundling_length(&mut self, len: usize) {
        self.bundling_length = len.max(1);
    }

    /// Detect `adapter` and install it on this connection.
    ///
    /// Any previous adapter is dropped without being closed.
    ///
    /// # Errors
    ///
    /// - Whatever [`Adapter::detect`] returns. The connection keeps no
    ///   adapter in that case.
    pub fn attach(&mut self, mut adapter: Box<dyn Adapter>) -> adapter::Result<()> {
        self.adapter = None;
        self.flags = AdapterFlags::empty();
        self.bundling_length = 1;
        match adapter.detect(self) {
            Ok(()) => {
                debug!(
                    index = self.index,
                    kind = ?self.kind,
                    name = self.adapter_name.as_deref().unwrap_or(""),
                    "adapter detected"
                );
                self.adapter = Some(adapter);
                Ok(())
            }
            Err(e) => {
                self.count_error(BusCounter::DetectErrors, &e);
                Err(e)
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn reset(&mut self) -> adapter::Result<Reset> {
        self.record(BusCounter::Resets);
        let reset = self.primitive(BusCounter::ResetErrors, |a| a.reset())?;
        if reset == Reset::Short {
            self.count_error(BusCounter::ResetErrors, &AdapterError::Hardware("bus short".into()));
        }
        Ok(reset)
    }

    pub fn next_both(&mut self, search: &mut Search) -> adapter::Result<Option<RomId>> {
        self.primitive(BusCounter::SearchErrors, |a| a.next_both(search))
    }

    pub fn power_byte(&mut self, byte: u8, delay: Duration) -> adapter::Result<u8> {
        self.primitive(BusCounter::PullupErrors, |a| a.power_byte(byte, delay))
    }

    pub fn program_pulse(&mut self) -> adapter::Result<()> {
        self.primitive(BusCounter::ProgramErrors, |a| a.program_pulse())
    }

    pub fn sendback_data(&mut self, data: &mut [u8]) -> adapter::Result<()> {
        self.primitive(BusCounter::ReadErrors, |a| a.sendback_data(data))
    }

    pub fn sendback_bits(&mut self, bits: &mut [u8]) -> adapter::Result<()> {
        self.primitive(BusCounter::ReadErrors, |a| a.sendback_bits(bits))
    }

    pub fn select(&mut self, rom: Option<&RomId>) -> adapter::Result<()> {
        self.primitive(BusCounter::WriteErrors, |a| a.select(rom))
    }

    pub fn select_and_sendback(
        &mut self,
        rom: Option<&RomId>,
        data: &mut [u8],
    ) -> adapter::Result<()> {
        self.primitive(BusCounter::ReadErrors, |a| a.select_and_sendback(rom, data))
    }

    /// Re-establish the adapter.
    ///
    /// The adapter may rewrite identity, flags and bundling length.
    pub fn reconnect(&mut self) -> adapter::Result<()> {
        self.record(BusCounter::Reconnects);
        let mut adapter = self.adapter.take().ok_or(AdapterError::NotSupported)?;
        let ret = adapter.reconnect(self);
        self.adapter = Some(adapter);
        if let Err(e) = &ret {
            self.count_error(BusCounter::ReconnectErrors, e);
        }
        ret
    }

    /// Close and detach the adapter.
    ///
    /// The adapter is detached even if closing it fails.
    pub fn close(&mut self) -> adapter::Result<()> {
        let mut adapter = self.adapter.take().ok_or(AdapterError::NotSupported)?;
        let ret = adapter.close();
        if let Err(e) = &ret {
            self.count_error(BusCounter::CloseErrors, e);
        }
        ret
    }
}

// Private
impl Connection {
    /// Run a primitive on the attached adapter, timing it and counting
    /// failures against `on_error`.
    fn primitive<T>(
        &mut self,
        on_error: BusCounter,
        f: impl FnOnce(&mut dyn Adapter) -> adapter::Result<T>,
    ) -> adapter::Result<T> {
        let adapter = self.adapter.as_deref_mut().ok_or(AdapterError::NotSupported)?;
        let start = Instant::now();
        let ret = f(adapter);
        self.stats.accumulate(self.index, start.elapsed());
        if let Err(e) = &ret {
            self.count_error(on_error, e);
        }
        ret
    }

    /// Unsupported primitives aren't bus errors.
    fn count_error(&self, counter: BusCounter, e: &AdapterError) {
        if matches!(e, AdapterError::NotSupported) {
            return;
        }
        warn!(index = self.index, ?counter, error = %e, "adapter failure");
        self.record(counter);
        self.record(BusCounter::Errors);
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("index", &self.index)
            .field("address", &self.address)
            .field("kind", &self.kind)
            .field("adapter_name", &self.adapter_name)
            .field("bus_mode", &self.bus_mode)
            .field("set_speed", &self.set_speed)
            .field("changed_bus_settings", &self.changed_bus_settings)
            .field("attached", &self.adapter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::DurationSource;
    use anyhow::Result;

    /// USB adapter stand-in. Echoes sent data inverted, fails resets on
    /// request.
    #[derive(Default)]
    struct Mock {
        fail_reset: bool,
        reconnects: usize,
    }

    impl Adapter for Mock {
        fn detect(&mut self, conn: &mut Connection) -> adapter::Result<()> {
            conn.set_identity(AdapterKind::Ds9490, "DS9490");
            conn.set_flags(AdapterFlags::OVERDRIVE | AdapterFlags::BUNDLE);
            conn.set_bundling_length(64);
            Ok(())
        }

        fn reset(&mut self) -> adapter::Result<Reset> {
            if self.fail_reset {
                Err(AdapterError::Hardware("no response".into()))
            } else {
                Ok(Reset::Presence)
            }
        }

        fn sendback_data(&mut self, data: &mut [u8]) -> adapter::Result<()> {
            data.iter_mut().for_each(|b| *b = !*b);
            Ok(())
        }

        fn reconnect(&mut self, conn: &mut Connection) -> adapter::Result<()> {
            self.reconnects += 1;
            conn.set_identity(AdapterKind::Ds9490, "DS9490 (reconnected)");
            Ok(())
        }
    }

    struct Absent;

    impl Adapter for Absent {
        fn detect(&mut self, _conn: &mut Connection) -> adapter::Result<()> {
            Err(AdapterError::NotPresent)
        }
    }

    fn usb() -> Connection {
        Connection::new(2, "/dev/bus/usb/001/004", BusMode::Usb, Arc::new(Registry::new()))
    }

    #[test]
    fn attach() -> Result<()> {
        let mut conn = usb();
        assert!(!conn.is_attached());
        conn.attach(Box::new(Mock::default()))?;
        assert!(conn.is_attached());
        assert_eq!(conn.kind(), AdapterKind::Ds9490);
        assert_eq!(conn.bundling_length(), 64);
        assert!(conn.flags().contains(AdapterFlags::OVERDRIVE));
        Ok(())
    }

    #[test]
    fn detect_failure() {
        let mut conn = usb();
        let err = conn.attach(Box::new(Absent)).unwrap_err();
        assert!(matches!(err, AdapterError::NotPresent));
        assert!(!conn.is_attached());
        assert_eq!(conn.stats().count(2, BusCounter::DetectErrors), 1);
        assert_eq!(conn.stats().count(2, BusCounter::Errors), 1);
    }

    #[test]
    fn primitives_counted() -> Result<()> {
        let mut conn = usb();
        conn.attach(Box::new(Mock {
            fail_reset: true,
            ..Mock::default()
        }))?;
        assert!(conn.reset().is_err());
        let mut data = [0x00, 0xF0];
        conn.sendback_data(&mut data)?;
        assert_eq!(data, [0xFF, 0x0F]);

        let stats = conn.stats();
        assert_eq!(stats.count(2, BusCounter::Resets), 1);
        assert_eq!(stats.count(2, BusCounter::ResetErrors), 1);
        assert_eq!(stats.count(2, BusCounter::Errors), 1);
        assert_eq!(stats.count(2, BusCounter::ReadErrors), 0);
        assert!(stats.duration(2, DurationSource::Connection(0)).is_some());
        Ok(())
    }

    #[test]
    fn unattached() {
        let mut conn = usb();
        assert!(matches!(conn.reset(), Err(AdapterError::NotSupported)));
        assert!(matches!(conn.close(), Err(AdapterError::NotSupported)));
    }

    #[test]
    fn reconnect() -> Result<()> {
        let mut conn = usb();
        conn.attach(Box::new(Mock::default()))?;
        conn.reconnect()?;
        assert_eq!(conn.adapter_name(), Some("DS9490 (reconnected)"));
        assert_eq!(conn.stats().count(2, BusCounter::Reconnects), 1);
        assert!(conn.is_attached());
        Ok(())
    }

    #[test]
    fn close_detaches() -> Result<()> {
        let mut conn = usb();
        conn.attach(Box::new(Mock::default()))?;
        // Mock can't close.
        assert!(matches!(conn.close(), Err(AdapterError::NotSupported)));
        assert!(!conn.is_attached());
        assert_eq!(conn.stats().count(2, BusCounter::CloseErrors), 0);
        Ok(())
    }

    #[test]
    fn config() {
        let config = Config {
            alt_usb: false,
            overdrive: true,
            ds2404_compliance: true,
            flexible_timing: false,
        };
        let conn = Connection::with_config(0, "x", BusMode::Usb, Arc::new(Registry::new()), &config);
        assert_eq!(conn.speed(), Speed::Overdrive);
        assert!(conn.ds2404_compliance());
        assert_eq!(conn.usb_timing().pulldown_slew_rate, 5);
        assert_eq!(conn.usb_timing().write_one_low_time, 4);
        assert_eq!(conn.usb_timing().data_sample_offset, 4);
        assert!(!conn.usb_timing().flextime);
    }

    #[test]
    fn take_changed() {
        let mut conn = usb();
        conn.changed_bus_settings = true;
        assert!(conn.take_changed_bus_settings());
        assert!(!conn.changed_bus_settings());
    }
}
