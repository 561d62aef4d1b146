//! Named, TTL-bearing alarms any component can raise for operator
//! visibility, surfaced as the status JSON's
//! `alarms` array.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::tick::{Clock, Tick};

/// A single named alarm, expiring `ttl` seconds after it was last raised.
#[derive(Debug, Clone, Serialize)]
pub struct Alarm {
    pub name: String,
    pub message: String,
    #[serde(skip)]
    expires_at: Tick,
}

/// Process-wide alarm list, constructed once at startup and shared by
/// `Arc` like every other ambient cache, never stashed in a global.
#[derive(Debug, Default)]
pub struct AlarmTable {
    alarms: Mutex<HashMap<String, Alarm>>,
}

impl AlarmTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise (or refresh) a named alarm with the given TTL in seconds.
    pub fn raise(&self, clock: &Clock, name: impl Into<String>, message: impl Into<String>, ttl_secs: u64) {
        let name = name.into();
        let expires_at = Tick::from_secs(clock.tick().as_secs() + ttl_secs);
        let mut alarms = self.alarms.lock().expect("alarm table mutex poisoned");
        alarms.insert(name.clone(), Alarm { name, message: message.into(), expires_at });
    }

    pub fn clear(&self, name: &str) {
        let mut alarms = self.alarms.lock().expect("alarm table mutex poisoned");
        alarms.remove(name);
    }

    /// Non-expired alarms, for the status JSON `alarms` array. Also prunes
    /// expired entries so the table doesn't grow unboundedly.
    pub fn active(&self, now: Tick) -> Vec<Alarm> {
        let mut alarms = self.alarms.lock().expect("alarm table mutex poisoned");
        alarms.retain(|_, a| a.expires_at > now);
        alarms.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raised_alarm_is_active_before_ttl_expiry() {
        let clock = Clock::new();
        let table = AlarmTable::new();
        table.raise(&clock, "dedup_lock_contended", "high contention", 60);
        let active = table.active(clock.tick());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "dedup_lock_contended");
    }

    #[test]
    fn expired_alarm_is_pruned() {
        let clock = Clock::new();
        let table = AlarmTable::new();
        table.raise(&clock, "transient", "blip", 0);
        let later = Tick::from_secs(clock.tick().as_secs() + 5);
        let active = table.active(later);
        assert!(active.is_empty());
    }

    #[test]
    fn clear_removes_alarm_immediately() {
        let clock = Clock::new();
        let table = AlarmTable::new();
        table.raise(&clock, "name", "msg", 600);
        table.clear("name");
        assert!(table.active(clock.tick()).is_empty());
    }
}
