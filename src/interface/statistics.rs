//! Bus statistics.
//!
//! Every value is a snapshot taken under the [`Registry`](crate::stats::Registry)
//! lock.
use super::{Handlers, Result};
use crate::{
    connection::Connection,
    error::PropertyError,
    property::{Payload, Property},
    stats::{self, DurationSource},
    value::Query,
};

pub(crate) fn handlers(property: &Property) -> Option<Handlers> {
    match (property.name, property.payload) {
        ("elapsed_time", _) => Some(Handlers::read_only(elapsed)),
        (_, Payload::Counter(_)) => Some(Handlers::read_only(counter)),
        (_, Payload::Direct(_)) => Some(Handlers::read_only(duration)),
        _ => None,
    }
}

fn elapsed(_: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    q.set_unsigned(conn.stats().elapsed());
    Ok(())
}

fn counter(p: &Property, _: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    let Payload::Counter(counter) = p.payload else {
        return Err(PropertyError::NotFound);
    };
    q.set_unsigned(conn.stats().count(conn.index(), counter));
    Ok(())
}

/// The extension, if any, selects a slot relative to the payload's.
fn duration(p: &Property, ext: Option<usize>, conn: &Connection, q: &mut Query) -> Result<()> {
    let Payload::Direct(source) = p.payload else {
        return Err(PropertyError::NotFound);
    };
    let source = match (source, ext) {
        (source, None) | (source @ DurationSource::Total, Some(0)) => source,
        (DurationSource::Connection(slot), Some(i)) => DurationSource::Connection(slot + i),
        (DurationSource::Total, Some(_)) => return Err(PropertyError::NotFound),
    };
    let time = conn
        .stats()
        .duration(conn.index(), source)
        .ok_or(PropertyError::NotFound)?;
    q.set_float(stats::seconds(time));
    Ok(())
}
