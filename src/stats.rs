//! Bus statistics shared by every connection.
//!
//! One [`Registry`] holds every per-connection counter row, the
//! per-connection bus time, the process-wide total bus time, and the instant
//! the registry was created. All of it sits behind a single lock, so a
//! snapshot of one field is always consistent with the others.
//!
//! Critical sections are short and never nest.
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

/// Counted bus events.
///
/// The discriminant is the index into a connection's counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusCounter {
    Reconnects,
    ReconnectErrors,
    Locks,
    Unlocks,
    Errors,
    Resets,
    ProgramErrors,
    PullupErrors,
    ResetErrors,
    ReadErrors,
    WriteErrors,
    OpenErrors,
    CloseErrors,
    DetectErrors,
    SearchErrors,
    StatusErrors,
    Timeouts,
}

impl BusCounter {
    /// Number of counters in a row.
    pub const COUNT: usize = 17;

    /// Every counter, in row order.
    pub const ALL: [BusCounter; Self::COUNT] = [
        Self::Reconnects,
        Self::ReconnectErrors,
        Self::Locks,
        Self::Unlocks,
        Self::Errors,
        Self::Resets,
        Self::ProgramErrors,
        Self::PullupErrors,
        Self::ResetErrors,
        Self::ReadErrors,
        Self::WriteErrors,
        Self::OpenErrors,
        Self::CloseErrors,
        Self::DetectErrors,
        Self::SearchErrors,
        Self::StatusErrors,
        Self::Timeouts,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Which accumulated duration to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSource {
    /// The connection's own bus time, selected by slot.
    Connection(usize),

    /// Bus time summed over every connection.
    Total,
}

/// Number of bus time slots each connection has.
pub const BUS_TIME_SLOTS: usize = 1;

#[derive(Debug, Default)]
struct Row {
    counts: [u64; BusCounter::COUNT],
    bus_time: [Duration; BUS_TIME_SLOTS],
}

#[derive(Debug)]
struct Inner {
    rows: HashMap<usize, Row>,
    total_bus_time: Duration,
}

/// Process-wide counter and duration registry.
#[derive(Debug)]
pub struct Registry {
    start: Instant,
    inner: Mutex<Inner>,
}

impl Registry {
    /// New registry, every counter zero, started now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            inner: Mutex::new(Inner {
                rows: HashMap::new(),
                total_bus_time: Duration::ZERO,
            }),
        }
    }

    /// The registry shared by the whole process.
    ///
    /// Created on first use, which also fixes the start time used by
    /// [`Registry::elapsed`].
    pub fn global() -> Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::new())).clone()
    }

    /// Add one to `counter` for connection `index`.
    pub fn increment(&self, index: usize, counter: BusCounter) {
        self.add(index, counter, 1)
    }

    /// Add `n` to `counter` for connection `index`.
    pub fn add(&self, index: usize, counter: BusCounter, n: u64) {
        let mut inner = self.inner.lock();
        let count = &mut inner.rows.entry(index).or_default().counts[counter.index()];
        *count = count.saturating_add(n);
    }

    /// Add `time` to the bus time of connection `index` and to the total.
    pub fn accumulate(&self, index: usize, time: Duration) {
        let mut inner = self.inner.lock();
        inner.total_bus_time += time;
        inner.rows.entry(index).or_default().bus_time[0] += time;
    }

    /// Snapshot of `counter` for connection `index`.
    ///
    /// Connections that never counted anything read as zero.
    pub fn count(&self, index: usize, counter: BusCounter) -> u64 {
        let inner = self.inner.lock();
        inner
            .rows
            .get(&index)
            .map_or(0, |row| row.counts[counter.index()])
    }

    /// Snapshot of an accumulated duration.
    ///
    /// Returns [`None`] if `source` names a slot that doesn't exist.
    pub fn duration(&self, index: usize, source: DurationSource) -> Option<Duration> {
        let inner = self.inner.lock();
        match source {
            DurationSource::Total => Some(inner.total_bus_time),
            DurationSource::Connection(slot) if slot < BUS_TIME_SLOTS => Some(
                inner
                    .rows
                    .get(&index)
                    .map_or(Duration::ZERO, |row| row.bus_time[slot]),
            ),
            DurationSource::Connection(_) => None,
        }
    }

    /// Whole seconds since the registry was created.
    pub fn elapsed(&self) -> u64 {
        // Taken under the lock so it orders with the other snapshots.
        let _inner = self.inner.lock();
        self.start.elapsed().as_secs()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Seconds as a float, truncated to milliseconds.
pub fn seconds(time: Duration) -> f64 {
    time.as_secs() as f64 + f64::from(time.subsec_micros() / 1000) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn concurrent_increments() {
        const THREADS: usize = 8;
        const PER_THREAD: u64 = 1000;

        let reg = Arc::new(Registry::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        reg.increment(0, BusCounter::Resets);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.count(0, BusCounter::Resets), THREADS as u64 * PER_THREAD);
        assert_eq!(reg.count(0, BusCounter::Errors), 0);
        assert_eq!(reg.count(1, BusCounter::Resets), 0);
    }

    #[test]
    fn rows_are_independent() {
        let reg = Registry::new();
        reg.increment(0, BusCounter::Timeouts);
        reg.add(3, BusCounter::Timeouts, 5);
        assert_eq!(reg.count(0, BusCounter::Timeouts), 1);
        assert_eq!(reg.count(3, BusCounter::Timeouts), 5);
    }

    #[test]
    fn durations() {
        let reg = Registry::new();
        reg.accumulate(0, Duration::from_millis(1500));
        reg.accumulate(1, Duration::from_millis(250));

        let conn0 = reg.duration(0, DurationSource::Connection(0));
        assert_eq!(conn0, Some(Duration::from_millis(1500)));
        let total = reg.duration(0, DurationSource::Total);
        assert_eq!(total, Some(Duration::from_millis(1750)));
        assert_eq!(reg.duration(0, DurationSource::Connection(1)), None);
        assert_eq!(
            reg.duration(7, DurationSource::Connection(0)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn seconds_truncates_to_millis() {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(seconds(Duration::new(2, 999_999_999)), 2.999));
        assert!(close(seconds(Duration::new(1, 1_999_000)), 1.001));
        assert_eq!(seconds(Duration::from_micros(999)), 0.0);
    }

    #[test]
    fn elapsed_is_monotonic() {
        let reg = Registry::new();
        let mut last = reg.elapsed();
        assert!(last <= 1);
        for _ in 0..100 {
            let now = reg.elapsed();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn counter_order() {
        for (i, c) in BusCounter::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }
}
