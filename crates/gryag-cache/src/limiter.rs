//! Fixed-window rate counters keyed by namespaced strings
//! (`rl:chat:<id>`, `rl:user:<chat>:<user>`).

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    /// Time until the current window resets. Zero when allowed.
    pub retry_in: Duration,
}

struct Counter {
    count: u32,
    window_ends: Instant,
}

pub struct RateLimiter {
    counters: DashMap<String, Counter>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Increment the counter for `key` and report whether the request was
    /// within `max` for the current window. The window starts at the first
    /// increment and resets lazily once it has elapsed.
    pub fn check(&self, key: &str, max: u32, window: Duration) -> RateDecision {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| Counter {
                count: 0,
                window_ends: now + window,
            });

        if entry.window_ends <= now {
            entry.count = 0;
            entry.window_ends = now + window;
        }

        let allowed = entry.count < max;
        entry.count += 1;

        RateDecision {
            allowed,
            retry_in: if allowed {
                Duration::ZERO
            } else {
                entry.window_ends.saturating_duration_since(now)
            },
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exactly_max_then_denies() {
        let rl = RateLimiter::new();
        let window = Duration::from_secs(60);
        for _ in 0..3 {
            assert!(rl.check("rl:chat:-1", 3, window).allowed);
        }
        let denied = rl.check("rl:chat:-1", 3, window);
        assert!(!denied.allowed);
        assert!(denied.retry_in > Duration::ZERO);
    }

    #[test]
    fn keys_are_independent() {
        let rl = RateLimiter::new();
        let window = Duration::from_secs(60);
        assert!(rl.check("rl:user:-1:7", 1, window).allowed);
        assert!(!rl.check("rl:user:-1:7", 1, window).allowed);
        assert!(rl.check("rl:user:-1:8", 1, window).allowed);
        assert!(rl.check("rl:chat:-1", 1, window).allowed);
    }

    #[test]
    fn window_expiry_resets_count() {
        let rl = RateLimiter::new();
        let window = Duration::from_millis(20);
        assert!(rl.check("k", 1, window).allowed);
        assert!(!rl.check("k", 1, window).allowed);
        std::thread::sleep(Duration::from_millis(30));
        assert!(rl.check("k", 1, window).allowed);
    }

    #[test]
    fn zero_max_denies_first_request() {
        let rl = RateLimiter::new();
        assert!(!rl.check("k", 0, Duration::from_secs(60)).allowed);
    }
}
