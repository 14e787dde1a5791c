//! Injectable clock capability.
//!
//! `spec.md` §5 requires all TTL arithmetic to run off a single, injectable
//! clock so tests can pin "now" and pin exactly when a message or claim is
//! considered expired, without sleeping in real time.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// A source of "now" for TTL arithmetic. Implementations must be cheap to
/// call and safe to share across tasks.
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The production clock: wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock with a fixed or manually-advanced value, used by tests that need
/// to observe TTL expiry deterministically.
#[derive(Debug, Clone)]
pub struct FrozenClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FrozenClock {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += duration;
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().expect("clock mutex poisoned") = now;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// A shared, dynamically-dispatched clock handle threaded through drivers.
pub type SharedClock = Arc<dyn Clock>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_clock_advances() {
        let start = Utc::now();
        let clock = FrozenClock::at(start);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));
    }
}
