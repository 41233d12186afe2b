//! FIFO queue of composed proactive replies, drained by the frontend's
//! polling endpoint.

use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

pub struct ProactiveQueue {
    tx: mpsc::UnboundedSender<(i64, String)>,
    rx: Mutex<mpsc::UnboundedReceiver<(i64, String)>>,
}

impl ProactiveQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn push(&self, chat_id: i64, text: String) {
        if self.tx.send((chat_id, text)).is_err() {
            warn!(chat_id, "proactive queue closed — item dropped");
        }
    }

    /// Pop the oldest item, waiting up to `block_for`. `None` on timeout.
    pub async fn pop(&self, block_for: Duration) -> Option<(i64, String)> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(block_for, rx.recv()).await.ok().flatten()
    }
}

impl Default for ProactiveQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let q = ProactiveQueue::new();
        q.push(-1, "first".into());
        q.push(-2, "second".into());

        assert_eq!(
            q.pop(Duration::from_millis(50)).await,
            Some((-1, "first".into()))
        );
        assert_eq!(
            q.pop(Duration::from_millis(50)).await,
            Some((-2, "second".into()))
        );
    }

    #[tokio::test]
    async fn empty_pop_times_out() {
        let q = ProactiveQueue::new();
        assert_eq!(q.pop(Duration::from_millis(20)).await, None);
    }

    #[tokio::test]
    async fn pop_wakes_on_push() {
        let q = std::sync::Arc::new(ProactiveQueue::new());
        let q2 = q.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            q2.push(-7, "late arrival".into());
        });
        assert_eq!(
            q.pop(Duration::from_secs(5)).await,
            Some((-7, "late arrival".into()))
        );
    }
}
