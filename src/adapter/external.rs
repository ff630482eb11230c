//! Placeholder adapter for devices that live outside the bus code.
//!
//! Only [`Adapter::detect`] is implemented. It's the smallest legal adapter.
use super::{Adapter, AdapterFlags, AdapterKind, Result};
use crate::connection::Connection;

#[derive(Debug, Default, Clone, Copy)]
pub struct External;

impl Adapter for External {
    fn detect(&mut self, conn: &mut Connection) -> Result<()> {
        conn.set_identity(AdapterKind::External, "External");
        conn.set_flags(AdapterFlags::empty());
        conn.set_bundling_length(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapter::{RomId, Search},
        connection::BusMode,
        error::AdapterError,
        stats::{BusCounter, Registry},
    };
    use anyhow::Result;
    use std::{sync::Arc, time::Duration};

    #[test]
    fn detect() -> Result<()> {
        let mut conn = Connection::new(0, "external", BusMode::External, Arc::new(Registry::new()));
        conn.attach(Box::new(External))?;
        assert_eq!(conn.kind(), AdapterKind::External);
        assert_eq!(conn.adapter_name(), Some("External"));
        assert_eq!(conn.bundling_length(), 1);
        assert!(conn.flags().is_empty());
        Ok(())
    }

    #[test]
    fn everything_else_unsupported() -> Result<()> {
        let stats = Arc::new(Registry::new());
        let mut conn = Connection::new(0, "external", BusMode::External, Arc::clone(&stats));
        conn.attach(Box::new(External))?;

        let unsupported = |r: std::result::Result<(), AdapterError>| {
            assert!(matches!(r, Err(AdapterError::NotSupported)), "{r:?}");
        };
        let rom = RomId::default();
        let mut buf = [0xFFu8; 4];
        unsupported(conn.reset().map(drop));
        unsupported(conn.next_both(&mut Search::default()).map(drop));
        unsupported(conn.power_byte(0xCC, Duration::from_millis(1)).map(drop));
        unsupported(conn.program_pulse());
        unsupported(conn.sendback_data(&mut buf));
        unsupported(conn.sendback_bits(&mut buf));
        unsupported(conn.select(Some(&rom)));
        unsupported(conn.select_and_sendback(None, &mut buf));
        unsupported(conn.reconnect());
        unsupported(conn.close());

        // Nothing was touched or counted as a bus error.
        assert_eq!(buf, [0xFF; 4]);
        assert_eq!(stats.count(0, BusCounter::Errors), 0);
        Ok(())
    }

    #[test]
    fn direct_calls_unsupported() {
        let mut ext = External;
        assert!(matches!(ext.reset(), Err(AdapterError::NotSupported)));
        assert!(matches!(ext.close(), Err(AdapterError::NotSupported)));
    }
}
