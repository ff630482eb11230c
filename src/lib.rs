//! Typed properties for 1-Wire bus adapters
//!
//! Adapter settings and bus statistics are exposed as named, typed
//! properties grouped into devices, the way a filesystem front end would
//! show them as files.
//!
//! # Implementation details
//!
//! Path resolution, the transport, and the bus protocols themselves are not
//! handled here. Callers resolve a path to a [`property::Device`] and
//! [`property::Property`] and hand them to [`dispatch::Dispatcher`] along
//! with the [`connection::Connection`] they belong to.
//!
//! Adapters announce what they can do by implementing [`adapter::Adapter`].
#![doc(html_root_url = "https://docs.rs/owattr/0.1.0")]

pub mod adapter;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod interface;
pub mod property;
pub mod stats;
pub mod value;
