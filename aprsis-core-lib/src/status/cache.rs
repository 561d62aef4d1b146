//! Status JSON cache: rebuilt at most once per second behind a single
//! exclusive lock (§5's "Status JSON cache" rule), so a burst of scrapes
//! never costs more than one document assembly per tick.

use std::sync::Mutex;

use crate::net::Shared;
use crate::tick::{Clock, Tick};

use super::document;

struct Cached {
    built_at: Tick,
    json: String,
}

pub struct StatusCache {
    started_at_wall_secs: u64,
    inner: Mutex<Option<Cached>>,
}

impl StatusCache {
    pub fn new(clock: &Clock) -> Self {
        StatusCache { started_at_wall_secs: clock.wall().as_secs(), inner: Mutex::new(None) }
    }

    /// The serialized `/status.json` body. Reuses the last build if it was
    /// assembled within the same tick second; otherwise rebuilds and caches
    /// the result for the next caller.
    pub fn json(&self, shared: &Shared, clock: &Clock) -> String {
        let now = clock.tick();
        let mut guard = self.inner.lock().expect("status cache mutex poisoned");
        if let Some(cached) = guard.as_ref() {
            if cached.built_at == now {
                return cached.json.clone();
            }
        }
        let doc = document::build(shared, clock, self.started_at_wall_secs);
        let json = serde_json::to_string(&doc).unwrap_or_else(|_| "{}".to_string());
        *guard = Some(Cached { built_at: now, json: json.clone() });
        json
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;
    use crate::dedupe::DedupeEngine;
    use crate::diagnostics::{AlarmTable, RxErrCounters};
    use crate::historydb::HistoryDb;
    use crate::net::ClientRegistry;

    fn test_shared(clock: Arc<Clock>) -> Shared {
        let cfg: Config = toml::from_str(
            r#"
            listen = "127.0.0.1:14580"
            server_id = "aprsis-core-test"
            server_callsign = "N0CALL"
            "#,
        )
        .unwrap();
        Shared {
            config: Arc::new(cfg),
            history: Arc::new(HistoryDb::new()),
            dedupe: Arc::new(DedupeEngine::new(30)),
            rxerr: Arc::new(RxErrCounters::new()),
            alarms: Arc::new(AlarmTable::new()),
            clock,
            registry: Arc::new(ClientRegistry::new()),
        }
    }

    #[test]
    fn repeated_calls_within_the_same_tick_reuse_the_cached_body() {
        let clock = Arc::new(Clock::new());
        let shared = test_shared(clock.clone());
        let cache = StatusCache::new(&clock);

        let addr: std::net::SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let first = cache.json(&shared, &clock);
        let (_handle, _rx) = shared.registry.register(addr, 1024, 8);
        let second = cache.json(&shared, &clock);

        // The second registration happened after the first build but
        // within the same tick second, so the cached body (with zero
        // clients) is still what's returned.
        assert_eq!(first, second);
    }
}
