//! Handlers for the adapter interface devices.
//!
//! Each submodule maps the properties of one [`Device`](crate::property::Device)
//! to [`Handlers`]. [`Dispatcher`](crate::dispatch::Dispatcher) collects them
//! once at startup.
use crate::{connection::Connection, error::PropertyError, property::Property, value::Query};
use std::fmt;

pub mod settings;
pub mod statistics;

pub type Result<T, E = PropertyError> = std::result::Result<T, E>;

/// Reads `property` of `conn` into the query.
pub type ReadFn = fn(&Property, Option<usize>, &Connection, &mut Query) -> Result<()>;

/// Writes the query value to `property` of `conn`.
pub type WriteFn = fn(&Property, Option<usize>, &mut Connection, &Query) -> Result<()>;

/// Behaviour of one property. [`None`] means unsupported.
#[derive(Clone, Copy, Default)]
pub struct Handlers {
    pub read: Option<ReadFn>,
    pub write: Option<WriteFn>,
}

impl Handlers {
    pub(crate) fn read_only(read: ReadFn) -> Self {
        Self {
            read: Some(read),
            write: None,
        }
    }

    pub(crate) fn read_write(read: ReadFn, write: WriteFn) -> Self {
        Self {
            read: Some(read),
            write: Some(write),
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}
