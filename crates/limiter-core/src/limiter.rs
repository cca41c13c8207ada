use crate::clock::Clock;
use crate::config::LimiterConfig;
use crate::error::ConfigError;
use crate::store::{KeyState, KeyStore};
use crate::window::Shift;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Read-only view of one key's counters at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeySnapshot {
    pub window_start: u64,
    pub current: u32,
    pub previous: u32,
    pub weighted: u64,
}

/// Sliding-window-counter limiter: at most `max_requests` per window per key,
/// approximated from the current and previous fixed windows.
#[derive(Debug)]
pub struct RateLimiter<C: Clock> {
    config: LimiterConfig,
    clock: C,
    store: KeyStore,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(max_requests: u32, window: Duration, clock: C) -> Result<Self, ConfigError> {
        Self::from_config(LimiterConfig::new(max_requests, window)?, clock)
    }

    pub fn from_config(config: LimiterConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            store: KeyStore::new(),
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.config.max_requests
    }

    pub fn window(&self) -> Duration {
        self.config.window()
    }

    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }

    /// Decides whether a request for `key` may proceed, counting it if so.
    pub fn allow_request(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let state = self.store.get_or_create(key, now);
        self.decide(key, &state, now)
    }

    fn decide(&self, key: &str, state: &KeyState, now: u64) -> bool {
        let window_ms = self.config.window_ms;
        let mut guard = state.lock();
        let Some(counters) = guard.as_mut() else {
            warn!(key = %key, "key state evicted during lookup, denying");
            return false;
        };

        match counters.advance(now, window_ms) {
            Shift::None => {}
            Shift::Rolled => {
                debug!(key = %key, previous = counters.previous, "window rolled over");
            }
            Shift::Reset { windows } => {
                debug!(key = %key, windows, "window idle, counters reset");
            }
        }

        let weighted = counters.weighted_count(now, window_ms);
        let admitted = weighted < u64::from(self.config.max_requests);
        if admitted {
            counters.current += 1;
        }
        trace!(key = %key, weighted, admitted, "rate decision");
        admitted
    }

    /// Removes keys whose current window started more than one window ago.
    /// Returns the number of keys removed.
    pub fn cleanup_expired_entries(&self) -> usize {
        let now = self.clock.now_millis();
        let cutoff = now.saturating_sub(self.config.window_ms);
        let evicted = self.store.evict_started_before(cutoff);
        if evicted > 0 {
            debug!(evicted, remaining = self.store.len(), "expired rate limit entries removed");
        }
        evicted
    }

    /// Counters for `key` as the next request would see them, without
    /// touching the stored state.
    pub fn peek(&self, key: &str) -> Option<KeySnapshot> {
        let now = self.clock.now_millis();
        let state = self.store.get(key)?;
        let mut counters = (*state.lock())?;
        counters.advance(now, self.config.window_ms);
        Some(KeySnapshot {
            window_start: counters.window_start,
            current: counters.current,
            previous: counters.previous,
            weighted: counters.weighted_count(now, self.config.window_ms),
        })
    }
}
