//! Property descriptors.
//!
//! A [`Device`] is a named, ordered group of [`Property`] descriptors. Both
//! are plain `static` data, built once and never changed. What a property
//! actually does when read or written is looked up by name in
//! [`crate::dispatch::Dispatcher`], descriptors hold no code.
//!
//! # Devices
//!
//! - [`SETTINGS`], live per-connection adapter settings.
//! - [`STATISTICS`], read only counters and durations from
//!   [`crate::stats::Registry`].
use crate::stats::{BusCounter, DurationSource};
use bitflags::bitflags;

/// Advisory length of an unsigned value, in bytes of text.
pub const LENGTH_UNSIGNED: usize = 12;

/// Advisory length of a yes/no value.
pub const LENGTH_YESNO: usize = 1;

/// Advisory length of a float value.
pub const LENGTH_FLOAT: usize = 12;

/// Value format of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Variable length text
    Ascii,

    /// Unsigned integer
    Unsigned,

    /// Boolean
    YesNo,

    /// Floating point
    Float,
}

/// How the value of a property is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheClass {
    /// Live per-connection state.
    Static,

    /// Shared counters and durations. Always read only.
    Statistic,
}

bitflags! {
    /// Operations a property has handlers for.
    pub struct Access: u8 {
        const READ = 1;
        const WRITE = 2;
        const READ_WRITE = Self::READ.bits | Self::WRITE.bits;
    }
}

/// How the elements of an aggregate are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// `name.0`, `name.1`, ...
    Numbered,

    /// `name.A`, `name.B`, ...
    Lettered,
}

/// How the elements of an aggregate are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Read and written together, then split.
    Aggregate,

    /// Each element read and written on its own.
    Separate,
}

/// A multi-element property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub elements: usize,
    pub naming: Naming,
    pub layout: Layout,
}

/// Handler specific data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    None,

    /// A counter in the connection's statistics row.
    Counter(BusCounter),

    /// An accumulated duration.
    Direct(DurationSource),
}

/// One named, typed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,

    /// Estimated length in bytes.
    ///
    /// Only meaningful for [`Format::Ascii`].
    pub length: usize,
    pub aggregate: Option<Aggregate>,
    pub format: Format,
    pub cache: CacheClass,
    pub access: Access,
    pub payload: Payload,
}

impl Property {
    const fn new(name: &'static str, length: usize, format: Format, access: Access) -> Self {
        Self {
            name,
            length,
            aggregate: None,
            format,
            cache: CacheClass::Static,
            access,
            payload: Payload::None,
        }
    }

    const fn stat(name: &'static str, length: usize, format: Format, payload: Payload) -> Self {
        Self {
            name,
            length,
            aggregate: None,
            format,
            cache: CacheClass::Statistic,
            access: Access::READ,
            payload,
        }
    }

    const fn counter(name: &'static str, counter: BusCounter) -> Self {
        Self::stat(name, LENGTH_UNSIGNED, Format::Unsigned, Payload::Counter(counter))
    }

    pub fn readable(&self) -> bool {
        self.access.contains(Access::READ)
    }

    pub fn writable(&self) -> bool {
        self.access.contains(Access::WRITE)
    }
}

/// Kind of a [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    InterfaceSettings,
    InterfaceStatistics,
}

/// A named group of properties.
#[derive(Debug)]
pub struct Device {
    pub name: &'static str,
    pub category: Category,
    pub properties: &'static [Property],
}

impl Device {
    /// Property called `name`, if any.
    pub fn property(&self, name: &str) -> Option<&'static Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Adapter settings.
pub static SETTINGS: Device = Device {
    name: "settings",
    category: Category::InterfaceSettings,
    properties: &[
        Property::new("name", 128, Format::Ascii, Access::READ),
        Property::new("address", 512, Format::Ascii, Access::READ),
        Property::new("datasampleoffset", LENGTH_UNSIGNED, Format::Unsigned, Access::READ_WRITE),
        Property::new("ds2404_compliance", LENGTH_YESNO, Format::YesNo, Access::READ_WRITE),
        Property::new("overdrive", LENGTH_YESNO, Format::YesNo, Access::READ_WRITE),
        Property::new("flexible_timing", LENGTH_YESNO, Format::YesNo, Access::READ_WRITE),
        Property::new("pulldownslewrate", LENGTH_UNSIGNED, Format::Unsigned, Access::READ_WRITE),
        Property::new("version", LENGTH_UNSIGNED, Format::Unsigned, Access::READ),
        Property::new("writeonelowtime", LENGTH_UNSIGNED, Format::Unsigned, Access::READ_WRITE),
    ],
};

/// Bus statistics.
pub static STATISTICS: Device = Device {
    name: "statistics",
    category: Category::InterfaceStatistics,
    properties: &[
        Property::stat("elapsed_time", LENGTH_UNSIGNED, Format::Unsigned, Payload::None),
        Property::stat(
            "bus_time",
            LENGTH_FLOAT,
            Format::Float,
            Payload::Direct(DurationSource::Connection(0)),
        ),
        Property::counter("reconnects", BusCounter::Reconnects),
        Property::counter("reconnect_errors", BusCounter::ReconnectErrors),
        Property::counter("locks", BusCounter::Locks),
        Property::counter("unlocks", BusCounter::Unlocks),
        Property::counter("errors", BusCounter::Errors),
        Property::counter("resets", BusCounter::Resets),
        Property::counter("program_errors", BusCounter::ProgramErrors),
        Property::counter("pullup_errors", BusCounter::PullupErrors),
        Property::counter("reset_errors", BusCounter::ResetErrors),
        Property::counter("read_errors", BusCounter::ReadErrors),
        Property::counter("write_errors", BusCounter::WriteErrors),
        Property::counter("open_errors", BusCounter::OpenErrors),
        Property::counter("close_errors", BusCounter::CloseErrors),
        Property::counter("detect_errors", BusCounter::DetectErrors),
        Property::counter("search_errors", BusCounter::SearchErrors),
        Property::counter("status_errors", BusCounter::StatusErrors),
        Property::counter("timeouts", BusCounter::Timeouts),
        Property::stat(
            "total_bus_time",
            LENGTH_FLOAT,
            Format::Float,
            Payload::Direct(DurationSource::Total),
        ),
    ],
};

/// Every device, in directory order.
pub fn devices() -> [&'static Device; 2] {
    [&SETTINGS, &STATISTICS]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unique_names() {
        for dev in devices() {
            let mut seen = HashSet::new();
            for p in dev.properties {
                assert!(seen.insert(p.name), "{}/{} repeated", dev.name, p.name);
            }
        }
    }

    #[test]
    fn statistics_are_read_only() {
        for p in STATISTICS.properties {
            assert_eq!(p.cache, CacheClass::Statistic, "{}", p.name);
            assert!(p.readable() && !p.writable(), "{}", p.name);
        }
        for p in SETTINGS.properties {
            assert_eq!(p.cache, CacheClass::Static, "{}", p.name);
        }
    }

    #[test]
    fn every_counter_exposed() {
        for c in BusCounter::ALL {
            assert!(
                STATISTICS
                    .properties
                    .iter()
                    .any(|p| p.payload == Payload::Counter(c)),
                "{c:?} missing"
            );
        }
    }

    #[test]
    fn lookup() {
        let p = SETTINGS.property("writeonelowtime").unwrap();
        assert_eq!(p.format, Format::Unsigned);
        assert!(p.writable());
        assert!(SETTINGS.property("bus_time").is_none());
        assert!(!SETTINGS.property("name").unwrap().writable());
    }
}
