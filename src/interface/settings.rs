//! Adapter settings.
//!
//! The timing properties only mean something on a DS2490 USB adapter. On any
//! other bus mode, reads of `pulldownslewrate`, `writeonelowtime` and
//! `datasampleoffset` give the chip defaults, while `flexible_timing` has no
//! default and fails. Writes to any of them fail.
//!
//! Accepted writes that change how the adapter drives the bus set
//! [`Connection::changed_bus_settings`]. Nothing is sent to the adapter here,
//! the bus code picks the change up before its next transaction.
use super::{Handlers, Result};
use crate::{
    connection::{BusMode, Connection, Speed},
    error::PropertyError,
    property::Property,
    value::Query,
};
use std::ops::RangeInclusive;
use tracing::{debug, warn};

/// Slew rate codes
///
/// | Code | V/µs |
/// |------|------|
/// | 0    | 15   |
/// | 1    | 2.20 |
/// | 2    | 1.65 |
/// | 3    | 1.37 |
/// | 4    | 1.10 |
/// | 5    | 0.83 |
/// | 6    | 0.70 |
/// | 7    | 0.55 |
const SLEW_RATE: RangeInclusive<u64> = 0..=7;
const SLEW_RATE_DEFAULT: u64 = 3;

/// µs
const WRITE_ONE_LOW_TIME: RangeInclusive<u64> = 8..=15;
const WRITE_ONE_LOW_TIME_DEFAULT: u64 = 10;

/// µs
const DATA_SAMPLE_OFFSET: RangeInclusive<u64> = 3..=10;
const DATA_SAMPLE_OFFSET_DEFAULT: u64 = 8;

pub(crate) fn handlers(property: &Property) -> Option<Handlers> {
    Some(match property.name {
        "name" => Handlers::read_only(name),
        "address" => Handlers::read_only(address),
        "version" => Handlers::read_only(version),
        "datasampleoffset" => Handlers::read_write(r_data_sample_offset, w_data_sample_offset),
        "ds2404_compliance" => Handlers::read_write(r_ds2404_compliance, w_ds2404_compliance),
        "overdrive" => Handlers::read_write(r_overdrive, w_overdrive),
        "flexible_timing" => Handlers::read_write(r_flextime, w_flextime),
        "pulldownslewrate" => Handlers::read_write(r_slew_rate, w_slew_rate),
        "writeonelowtime" => Handlers::read_write(r_write_one_low_time, w_write_one_low_time),
        _ => return None,
    })
}

fn is_usb(conn: &Connection) -> bool {
    conn.bus_mode() == BusMode::Usb
}

/// Value of `q` if it's within `range`, as the stored offset from its start.
fn in_range(p: &Property, q: &Query, range: RangeInclusive<u64>) -> Result<u8> {
    let v = q.unsigned();
    if !range.contains(&v) {
        warn!(property = p.name, value = v, ?range, "value out of range");
        return Err(PropertyError::InvalidArgument);
    }
    // Ranges are all well below 256 wide.
    Ok((v - range.start()) as u8)
}

fn usb_only(p: &Property, conn: &Connection) -> Result<()> {
    if is_usb(conn) {
        Ok(())
    } else {
        warn!(property = p.name, mode = ?conn.bus_mode(), "not supported on this bus");
        Err(PropertyError::NotSupported)
    }
}

fn name(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_ascii(conn.adapter_name().unwrap_or("").as_bytes());
    Ok(())
}

fn address(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_ascii(conn.address().as_bytes());
    Ok(())
}

fn version(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_unsigned(conn.kind().code().into());
    Ok(())
}

fn r_ds2404_compliance(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_yesno(conn.ds2404_compliance);
    Ok(())
}

fn w_ds2404_compliance(
    _: &Property,
    _: Option<usize>,
    conn: &mut Connection,
    q: &Query,
) -> Result<()> {
    conn.ds2404_compliance = q.yesno();
    Ok(())
}

fn r_overdrive(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_yesno(conn.set_speed == Speed::Overdrive);
    Ok(())
}

fn w_overdrive(_: &Property, _: Option<usize>, conn: &mut Connection, q: &Query) -> Result<()> {
    conn.set_speed = if q.yesno() {
        Speed::Overdrive
    } else {
        Speed::Slow
    };
    conn.changed_bus_settings = true;
    debug!(index = conn.index(), speed = ?conn.set_speed, "requested bus speed");
    Ok(())
}

fn r_flextime(p: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    usb_only(p, conn)?;
    q.set_yesno(conn.usb.flextime);
    Ok(())
}

fn w_flextime(p: &Property, _: Option<usize>, conn: &mut Connection, q: &Query) -> Result<()> {
    usb_only(p, conn)?;
    conn.usb.flextime = q.yesno();
    conn.changed_bus_settings = true;
    debug!(index = conn.index(), flextime = conn.usb.flextime, "set flexible timing");
    Ok(())
}

fn r_slew_rate(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_unsigned(if is_usb(conn) {
        conn.usb.pulldown_slew_rate.into()
    } else {
        SLEW_RATE_DEFAULT
    });
    Ok(())
}

fn w_slew_rate(p: &Property, _: Option<usize>, conn: &mut Connection, q: &Query) -> Result<()> {
    usb_only(p, conn)?;
    conn.usb.pulldown_slew_rate = in_range(p, q, SLEW_RATE)?;
    conn.changed_bus_settings = true;
    debug!(index = conn.index(), slew_rate = conn.usb.pulldown_slew_rate, "set slew rate");
    Ok(())
}

fn r_write_one_low_time(
    _: &Property,
    _: Option<usize>,
    conn: &Connection,
    q: &mut Query,
) -> Result<()> {
    q.set_unsigned(if is_usb(conn) {
        u64::from(conn.usb.write_one_low_time) + WRITE_ONE_LOW_TIME.start()
    } else {
        WRITE_ONE_LOW_TIME_DEFAULT
    });
    Ok(())
}

fn w_write_one_low_time(
    p: &Property,
    _: Option<usize>,
    conn: &mut Connection,
    q: &Query,
) -> Result<()> {
    usb_only(p, conn)?;
    conn.usb.write_one_low_time = in_range(p, q, WRITE_ONE_LOW_TIME)?;
    conn.changed_bus_settings = true;
    debug!(index = conn.index(), value = q.unsigned(), "set write one low time");
    Ok(())
}

fn r_data_sample_offset(
    _: &Property,
    _: Option<usize>,
    conn: &Connection,
    q: &mut Query,
) -> Result<()> {
    q.set_unsigned(if is_usb(conn) {
        u64::from(conn.usb.data_sample_offset) + DATA_SAMPLE_OFFSET.start()
    } else {
        DATA_SAMPLE_OFFSET_DEFAULT
    });
    Ok(())
}

fn w_data_sample_offset(
    p: &Property,
    _: Option<usize>,
    conn: &mut Connection,
    q: &Query,
) -> Result<()> {
    usb_only(p, conn)?;
    conn.usb.data_sample_offset = in_range(p, q, DATA_SAMPLE_OFFSET)?;
    conn.changed_bus_settings = true;
    debug!(index = conn.index(), value = q.unsigned(), "set data sample offset");
    Ok(())
}
