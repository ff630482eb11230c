//! Property read and write dispatch.
//!
//! The caller resolves a path to a [`Device`], a [`Property`] and an optional
//! extension index, then calls [`Dispatcher::read`] or
//! [`Dispatcher::write`]. Nothing here looks names up on behalf of the
//! caller.
//!
//! # Connection fields
//!
//! Reads only look at the connection. Writes may change these fields, so any
//! lock the bus code holds around reconfiguring a connection must also cover
//! them:
//!
//! - requested speed (`overdrive`)
//! - DS2404 compliance (`ds2404_compliance`)
//! - USB slew rate, write one low time, data sample offset and flexible
//!   timing
//! - the pending settings change flag
//!
//! The only other shared state touched is the [`Registry`](crate::stats::Registry),
//! which has its own lock.
//!
//! # Example
//!
//! ```rust
//! # use std::sync::Arc;
//! use owattr::{
//!     connection::{BusMode, Connection},
//!     dispatch::Dispatcher,
//!     property::SETTINGS,
//!     stats::Registry,
//!     value::{Query, Value},
//! };
//!
//! let dispatch = Dispatcher::new();
//! let mut conn = Connection::new(0, "/dev/ttyUSB0", BusMode::Usb, Arc::new(Registry::new()));
//!
//! let prop = SETTINGS.property("pulldownslewrate").unwrap();
//! let q = Query::parse(prop.format, "5").unwrap();
//! dispatch.write(&SETTINGS, prop, None, &mut conn, &q).unwrap();
//!
//! let v = dispatch.read_value(&SETTINGS, prop, None, &conn).unwrap();
//! assert_eq!(v, Value::Unsigned(5));
//! assert!(conn.changed_bus_settings());
//! ```
use crate::{
    connection::Connection,
    error::PropertyError,
    interface::{settings, statistics, Handlers},
    property::{devices, Category, Device, Property},
    value::{Query, Value},
};
use std::collections::HashMap;
use tracing::{debug, trace};

pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

/// Handlers for every known property, keyed by device and property name.
#[derive(Debug)]
pub struct Dispatcher {
    handlers: HashMap<(&'static str, &'static str), Handlers>,
}

impl Dispatcher {
    /// Collect the handlers of every device in [`devices`].
    pub fn new() -> Self {
        let mut handlers = HashMap::new();
        for device in devices() {
            let lookup: fn(&Property) -> Option<Handlers> = match device.category {
                Category::InterfaceSettings => settings::handlers,
                Category::InterfaceStatistics => statistics::handlers,
            };
            for property in device.properties {
                if let Some(h) = lookup(property) {
                    handlers.insert((device.name, property.name), h);
                }
            }
        }
        Self { handlers }
    }

    fn handlers(&self, device: &Device, property: &Property) -> Handlers {
        self.handlers
            .get(&(device.name, property.name))
            .copied()
            .unwrap_or_default()
    }

    /// Read `property` of `device` from `conn` into `query`.
    ///
    /// `query` must have been created with the property's format.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::NotSupported`] if the property can't be read, or
    ///   can't be read in the connection's bus mode
    /// - [`PropertyError::NotFound`] if `extension` selects nothing
    /// - [`PropertyError::InvalidArgument`] if `query` has the wrong format
    pub fn read(
        &self,
        device: &Device,
        property: &Property,
        extension: Option<usize>,
        conn: &Connection,
        query: &mut Query,
    ) -> Result<()> {
        let read = match self.handlers(device, property).read {
            Some(read) if property.readable() => read,
            _ => return Err(PropertyError::NotSupported),
        };
        if query.format() != property.format {
            return Err(PropertyError::InvalidArgument);
        }
        trace!(
            index = conn.index(),
            device = device.name,
            property = property.name,
            ?extension,
            "read"
        );
        read(property, extension, conn, query)
    }

    /// Like [`Dispatcher::read`], returning the whole value.
    pub fn read_value(
        &self,
        device: &Device,
        property: &Property,
        extension: Option<usize>,
        conn: &Connection,
    ) -> Result<Value> {
        let mut query = Query::new(property.format);
        self.read(device, property, extension, conn, &mut query)?;
        query.value().cloned().ok_or(PropertyError::NotFound)
    }

    /// Write the value in `query` to `property` of `device` on `conn`.
    ///
    /// The value is fully checked before anything is changed, a failed write
    /// leaves `conn` as it was.
    ///
    /// # Errors
    ///
    /// - [`PropertyError::NotSupported`] if the property can't be written, or
    ///   can't be written in the connection's bus mode
    /// - [`PropertyError::InvalidArgument`] if the value is outside the
    ///   property's domain, or `query` holds no value of the right format
    pub fn write(
        &self,
        device: &Device,
        property: &Property,
        extension: Option<usize>,
        conn: &mut Connection,
        query: &Query,
    ) -> Result<()> {
        let write = match self.handlers(device, property).write {
            Some(write) if property.writable() => write,
            _ => return Err(PropertyError::NotSupported),
        };
        if query.format() != property.format || query.value().is_none() {
            return Err(PropertyError::InvalidArgument);
        }
        write(property, extension, conn, query)?;
        debug!(
            index = conn.index(),
            device = device.name,
            property = property.name,
            value = %query.value().map(ToString::to_string).unwrap_or_default(),
            "write"
        );
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
