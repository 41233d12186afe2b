//! Per-chat exclusive processing locks with a TTL backstop.
//!
//! Acquire is set-if-absent-or-expired with a fresh holder token; release
//! is compare-and-delete on that token, so a holder whose TTL lapsed can
//! never evict the chat's next holder.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Opaque proof of lock ownership. Only the matching token can release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

struct Holder {
    token: String,
    expires_at: Instant,
}

pub struct ChatLocks {
    locks: DashMap<i64, Holder>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Single attempt, never waits. Returns the holder token on success.
    pub fn acquire(&self, chat_id: i64, ttl: Duration) -> Option<LockToken> {
        let now = Instant::now();
        let token = Uuid::new_v4().to_string();
        match self.locks.entry(chat_id) {
            // Still owned and the TTL has not lapsed.
            Entry::Occupied(held) if held.get().expires_at > now => None,
            Entry::Occupied(mut held) => {
                held.insert(Holder {
                    token: token.clone(),
                    expires_at: now + ttl,
                });
                Some(LockToken(token))
            }
            Entry::Vacant(slot) => {
                slot.insert(Holder {
                    token: token.clone(),
                    expires_at: now + ttl,
                });
                Some(LockToken(token))
            }
        }
    }

    /// Remove the lock only if `token` still owns it.
    pub fn release(&self, chat_id: i64, token: &LockToken) {
        self.locks.remove_if(&chat_id, |_, holder| holder.token == token.0);
    }
}

impl Default for ChatLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(120);

    #[test]
    fn second_acquire_within_ttl_fails() {
        let locks = ChatLocks::new();
        let token = locks.acquire(-1, TTL).unwrap();
        assert!(locks.acquire(-1, TTL).is_none());
        locks.release(-1, &token);
        assert!(locks.acquire(-1, TTL).is_some());
    }

    #[test]
    fn different_chats_do_not_contend() {
        let locks = ChatLocks::new();
        assert!(locks.acquire(-1, TTL).is_some());
        assert!(locks.acquire(-2, TTL).is_some());
    }

    #[test]
    fn expired_lock_can_be_taken() {
        let locks = ChatLocks::new();
        let _stale = locks.acquire(-1, Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(locks.acquire(-1, TTL).is_some());
    }

    #[test]
    fn stale_token_never_releases_new_holder() {
        let locks = ChatLocks::new();
        let stale = locks.acquire(-1, Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        let _fresh = locks.acquire(-1, TTL).unwrap();

        // The first holder's deferred release fires after re-acquire.
        locks.release(-1, &stale);

        // The new holder must still own the chat.
        assert!(locks.acquire(-1, TTL).is_none());
    }
}
