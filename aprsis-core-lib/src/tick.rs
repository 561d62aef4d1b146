//! Monotonic vs. wall-clock time, kept as distinct types on purpose.
//!
//! Every expiry and ordering decision in the core (dedup window, history
//! validity grace, idle timeouts) is driven by [`Tick`], which only ever
//! moves forward. [`WallClock`] exists solely for display in the status
//! JSON and log lines — mixing the two produces subtle bugs across clock
//! adjustments and DST changes, so there is no `From`/`Into` between them.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Seconds since an arbitrary, process-local epoch (`Instant::now()` at
/// startup). Strictly monotonic; safe to use for expiry arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tick(u64);

impl Tick {
    pub fn from_secs(secs: u64) -> Self {
        Tick(secs)
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    /// Saturating "is this tick older than `age` relative to `now`".
    pub fn age_exceeds(self, now: Tick, age: Duration) -> bool {
        now.0.saturating_sub(self.0) > age.as_secs()
    }
}

impl std::ops::Sub for Tick {
    type Output = Duration;

    fn sub(self, rhs: Tick) -> Duration {
        Duration::from_secs(self.0.saturating_sub(rhs.0))
    }
}

/// Wall-clock seconds since the Unix epoch, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock(u64);

impl WallClock {
    pub fn as_secs(self) -> u64 {
        self.0
    }
}

/// Source of both [`Tick`] and [`WallClock`] readings, constructed once at
/// startup and shared (`Arc`) by every component that needs "now".
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Clock { start: Instant::now() }
    }

    pub fn tick(&self) -> Tick {
        Tick(self.start.elapsed().as_secs())
    }

    pub fn wall(&self) -> WallClock {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        WallClock(secs)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_age_exceeds_uses_saturating_subtraction() {
        let old = Tick::from_secs(10);
        let now = Tick::from_secs(5);
        assert!(!old.age_exceeds(now, Duration::from_secs(0)));
    }

    #[test]
    fn tick_monotonic_from_clock() {
        let clock = Clock::new();
        let a = clock.tick();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock.tick();
        assert!(b >= a);
    }
}
