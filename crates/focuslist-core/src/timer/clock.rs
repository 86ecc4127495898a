//! Wall-clock access and countdown formatting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Source of the current time in milliseconds since the Unix epoch.
///
/// The engine only ever compares absolute timestamps, so a clock that jumps
/// forward (suspend, missed ticks) simply resolves more countdowns at once.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        now_ms()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Format a duration as `MM:SS`.
///
/// Minutes are not wrapped into hours, so 90 minutes prints as `90:00`.
/// Negative input clamps to `00:00`.
pub fn ms_to_clock_string(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Float variant of [`ms_to_clock_string`]; non-finite and negative input
/// clamps to `00:00`.
pub fn ms_to_clock_string_f64(ms: f64) -> String {
    if !ms.is_finite() || ms <= 0.0 {
        return ms_to_clock_string(0);
    }
    ms_to_clock_string(ms as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(ms_to_clock_string(65_000), "01:05");
        assert_eq!(ms_to_clock_string(0), "00:00");
        assert_eq!(ms_to_clock_string(999), "00:00");
        assert_eq!(ms_to_clock_string(25 * 60 * 1000), "25:00");
    }

    #[test]
    fn minutes_do_not_wrap_into_hours() {
        assert_eq!(ms_to_clock_string(90 * 60 * 1000 + 7_000), "90:07");
    }

    #[test]
    fn negative_and_nan_clamp_to_zero() {
        assert_eq!(ms_to_clock_string(-5), "00:00");
        assert_eq!(ms_to_clock_string_f64(-5.0), "00:00");
        assert_eq!(ms_to_clock_string_f64(f64::NAN), "00:00");
        assert_eq!(ms_to_clock_string_f64(65_400.9), "01:05");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(500);
        assert_eq!(other.now_ms(), 1_500);
        other.set(10);
        assert_eq!(clock.now_ms(), 10);
    }
}
