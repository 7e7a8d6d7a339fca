//! Fixed-window request limiter keyed by client id.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Upper bound on tracked client keys.
pub const DEFAULT_MAX_KEYS: usize = 10_000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: i64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    max_keys: usize,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            limit,
            window,
            max_keys: DEFAULT_MAX_KEYS,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().len()
    }

    /// Counts one request for `key`.
    pub fn check(&self, key: &str) -> RateDecision {
        let now = self.clock.now();
        let mut windows = self.windows.lock();

        if !windows.contains_key(key) && windows.len() >= self.max_keys {
            windows.retain(|_, w| now - w.started < self.window);
            if windows.len() >= self.max_keys {
                // oldest window goes first
                let oldest = windows
                    .iter()
                    .min_by_key(|(_, w)| w.started)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    windows.remove(&oldest);
                }
            }
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now - window.started >= self.window {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.limit {
            let retry_after = self.window - (now - window.started);
            tracing::debug!(client = key, "rate limited");
            return RateDecision::Limited {
                retry_after_secs: retry_after.num_seconds().max(1),
            };
        }
        window.count += 1;
        RateDecision::Allowed {
            remaining: self.limit - window.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn window_resets_after_expiry() {
        let clock = clock();
        let limiter = RateLimiter::with_clock(2, Duration::seconds(60), clock.clone());
        assert!(limiter.check("a").is_allowed());
        assert!(limiter.check("a").is_allowed());
        assert_eq!(
            limiter.check("a"),
            RateDecision::Limited {
                retry_after_secs: 60
            }
        );
        assert!(limiter.check("b").is_allowed());

        clock.advance(Duration::seconds(60));
        assert!(limiter.check("a").is_allowed());
    }

    #[test]
    fn key_map_is_bounded() {
        let clock = clock();
        let limiter =
            RateLimiter::with_clock(1, Duration::seconds(60), clock.clone()).with_max_keys(2);
        limiter.check("a");
        clock.advance(Duration::seconds(1));
        limiter.check("b");
        clock.advance(Duration::seconds(1));
        limiter.check("c");
        assert_eq!(limiter.tracked_keys(), 2);
        // "a" was evicted, so it starts a fresh window
        assert!(limiter.check("a").is_allowed());
    }
}
