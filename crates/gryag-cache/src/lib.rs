//! In-process ephemeral cache: rate counters, per-chat processing locks,
//! and the proactive outbound queue.
//!
//! One [`Cache`] instance is shared (via `Arc`) by the admission layer,
//! the orchestrator, and the proactive scheduler. Nothing here survives a
//! restart; everything expires by TTL or window.

pub mod limiter;
pub mod lock;
pub mod queue;

use std::time::Duration;

pub use limiter::RateDecision;
pub use lock::LockToken;

pub struct Cache {
    limiter: limiter::RateLimiter,
    locks: lock::ChatLocks,
    queue: queue::ProactiveQueue,
}

impl Cache {
    pub fn new() -> Self {
        Self {
            limiter: limiter::RateLimiter::new(),
            locks: lock::ChatLocks::new(),
            queue: queue::ProactiveQueue::new(),
        }
    }

    /// Fixed-window rate check. Allowed ⇔ the pre-increment count was
    /// below `max`. The counter always increments.
    pub fn check_rate_limit(&self, key: &str, max: u32, window: Duration) -> RateDecision {
        self.limiter.check(key, max, window)
    }

    /// Single-attempt, non-blocking lock acquire. `None` when another
    /// holder still owns the chat and its TTL has not lapsed.
    pub fn acquire_lock(&self, chat_id: i64, ttl: Duration) -> Option<LockToken> {
        self.locks.acquire(chat_id, ttl)
    }

    /// Compare-and-delete release: a stale token (TTL expired, chat
    /// re-acquired by someone else) never evicts the new holder.
    pub fn release_lock(&self, chat_id: i64, token: &LockToken) {
        self.locks.release(chat_id, token)
    }

    pub fn push_proactive(&self, chat_id: i64, text: String) {
        self.queue.push(chat_id, text)
    }

    /// Pop one queued proactive item, waiting up to `block_for`.
    pub async fn pop_proactive(&self, block_for: Duration) -> Option<(i64, String)> {
        self.queue.pop(block_for).await
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
