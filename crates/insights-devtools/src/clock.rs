//! Time sources
//!
//! `now` is the monotonic page clock (`performance.now()`), `epoch_ms` the
//! wall clock records are stamped with (`Date.now()`).

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub trait Clock {
    /// Monotonic milliseconds since the clock's origin
    fn now(&self) -> f64;

    /// Milliseconds since the Unix epoch
    fn epoch_ms(&self) -> u64;
}

/// Real time
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
    epoch_origin: u64,
}

impl ManualClock {
    /// Start at `now() == 0` with the wall clock at `epoch_origin`
    pub fn new(epoch_origin: u64) -> Self {
        Self {
            now: Cell::new(0.0),
            epoch_origin,
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn epoch_ms(&self) -> u64 {
        self.epoch_origin + self.now.get().max(0.0) as u64
    }
}
