//! Time source abstraction for token issuance and validation.
//!
//! Token lifetimes are expressed in Unix seconds. Production code reads the
//! system clock; tests pin the clock so that expirations are deterministic.

use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over the current time.
pub trait TimeSource: Send + Sync {
    /// Get the current time in seconds since Unix epoch.
    fn now_secs(&self) -> u64;
}

/// Real time source using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // duration_since(UNIX_EPOCH) only fails if system time is before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub u64);

impl TimeSource for FixedTimeSource {
    fn now_secs(&self) -> u64 {
        self.0
    }
}
