//! Time source.

use chrono::{DateTime, Utc};

/// Port for getting the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock using the OS time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
pub struct FixedClock {
    timestamp: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: std::sync::Mutex::new(timestamp),
        }
    }

    /// Move time forward.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut timestamp = self.timestamp.lock().unwrap();
        *timestamp += delta;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.timestamp.lock().unwrap()
    }
}
