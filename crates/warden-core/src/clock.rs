//! Wall-clock source for session bookkeeping.
//!
//! The heartbeat tracker reads time only through `Clock`, so hosts and tests
//! can substitute a controllable clock for `SystemClock`.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};

pub trait Clock: Send + Sync {
    /// Current time (UTC).
    fn now(&self) -> DateTime<Utc>;

    /// Label of the local timezone, stored alongside the first login.
    fn timezone_label(&self) -> String;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn timezone_label(&self) -> String {
        Local::now().offset().to_string()
    }
}

/// A clock that only moves when told to, at one-second resolution.
///
/// Intended for simulations and tests that need deterministic session keys.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: AtomicI64,
    timezone: String,
}

impl ManualClock {
    pub fn new(epoch_secs: i64) -> Self {
        Self {
            epoch_secs: AtomicI64::new(epoch_secs),
            timezone: "+00:00".to_string(),
        }
    }

    pub fn set(&self, epoch_secs: i64) {
        self.epoch_secs.store(epoch_secs, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.epoch_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.epoch_secs.load(Ordering::SeqCst), 0).unwrap_or_default()
    }

    fn timezone_label(&self) -> String {
        self.timezone.clone()
    }
}
