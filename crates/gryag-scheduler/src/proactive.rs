//! Proactive outreach scheduler.
//!
//! On each tick inside the Kyiv active-hours window, picks one chat active
//! in the last 7 days at random, asks the orchestrator to compose an
//! unsolicited turn, and queues the result for the frontend to deliver.
//! Everything off-window or empty is skipped silently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Timelike;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gryag_agent::Orchestrator;
use gryag_cache::Cache;
use gryag_store::Store;

use crate::hours::{kyiv_now, ActiveHours};

/// Chance that a proactive turn is told to share a web-search finding.
const SEARCH_PROBABILITY: f64 = 0.30;

/// Window of chat activity considered for outreach.
const RECENT_CHAT_DAYS: i64 = 7;

pub struct ProactiveScheduler {
    orchestrator: Arc<Orchestrator>,
    store: Arc<Store>,
    cache: Arc<Cache>,
    hours: ActiveHours,
    interval: Duration,
}

impl ProactiveScheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        store: Arc<Store>,
        cache: Arc<Cache>,
        hours: ActiveHours,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            store,
            cache,
            hours,
            interval,
        }
    }

    /// Main loop. Exits when the shutdown watch flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "proactive scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup isn't chatty.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("proactive scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let hour = kyiv_now().hour();
        if !self.hours.contains(hour) {
            debug!(hour, "outside active window");
            return;
        }

        let chats = match self
            .store
            .get_recent_chat_ids(chrono::Duration::days(RECENT_CHAT_DAYS))
        {
            Ok(chats) => chats,
            Err(e) => {
                warn!(error = %e, "recent chat lookup failed");
                return;
            }
        };
        if chats.is_empty() {
            debug!("no recently active chats");
            return;
        }

        let (chat_id, want_search) = {
            let mut rng = rand::thread_rng();
            (
                chats[rng.gen_range(0..chats.len())],
                rng.gen_bool(SEARCH_PROBABILITY),
            )
        };

        match self.orchestrator.compose_proactive(chat_id, want_search).await {
            Some(text) => {
                info!(chat_id, chars = text.len(), "proactive message queued");
                self.cache.push_proactive(chat_id, text);
            }
            None => debug!(chat_id, "proactive turn produced nothing"),
        }
    }
}
