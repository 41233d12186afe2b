//! Daily rolling summarization.
//!
//! Once a day at the configured Kyiv hour, walks every recently active chat
//! and regenerates the 7-day and 30-day digests whose interval has lapsed.
//! Per-chat failures are logged and skipped; one bad chat never aborts the
//! run.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gryag_agent::provider::LlmProvider;
use gryag_core::types::speaker_label;
use gryag_store::{Store, StoredMessage, SummaryKind};

use crate::hours::kyiv_now;
use crate::SchedulerError;

/// Hard cap on messages fed into one summary.
const TRANSCRIPT_LIMIT: usize = 2000;

/// Chats with no activity in this window are not summarized.
const ACTIVE_CHAT_DAYS: i64 = 30;

const SUMMARY_SYSTEM: &str = "You summarize group chat transcripts. Write a \
compact digest of the main topics, decisions, running jokes, and notable \
events. Keep names. Write in the chat's dominant language.";

pub struct SummarizationScheduler {
    store: Arc<Store>,
    provider: Arc<dyn LlmProvider>,
    run_hour: u8,
    interval_7: i64,
    interval_30: i64,
}

impl SummarizationScheduler {
    pub fn new(
        store: Arc<Store>,
        provider: Arc<dyn LlmProvider>,
        run_hour: u8,
        interval_7: i64,
        interval_30: i64,
    ) -> Self {
        Self {
            store,
            provider,
            run_hour,
            interval_7,
            interval_30,
        }
    }

    /// Main loop: a one-minute poll against the Kyiv clock, with a same-day
    /// guard so the daily trigger fires exactly once.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(run_hour = self.run_hour, "summarization scheduler started");
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_run: Option<NaiveDate> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = kyiv_now();
                    let today = now.date_naive();
                    if now.hour() == self.run_hour as u32 && last_run != Some(today) {
                        last_run = Some(today);
                        self.run_once().await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("summarization scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One full summarization pass over all recently active chats.
    pub async fn run_once(&self) {
        let chats = match self
            .store
            .get_recent_chat_ids(Duration::days(ACTIVE_CHAT_DAYS))
        {
            Ok(chats) => chats,
            Err(e) => {
                warn!(error = %e, "summarization: chat lookup failed");
                return;
            }
        };
        info!(chats = chats.len(), "summarization run started");

        for chat_id in chats {
            for (kind, interval_days) in [
                (SummaryKind::SevenDay, self.interval_7),
                (SummaryKind::ThirtyDay, self.interval_30),
            ] {
                match self.summarize_chat(chat_id, kind, interval_days).await {
                    Ok(true) => info!(chat_id, kind = kind.as_str(), "summary stored"),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(chat_id, kind = kind.as_str(), error = %e, "summary skipped")
                    }
                }
            }
        }
    }

    /// Produce one summary if its interval has lapsed. Returns whether a
    /// new row was written.
    async fn summarize_chat(
        &self,
        chat_id: i64,
        kind: SummaryKind,
        interval_days: i64,
    ) -> Result<bool, SchedulerError> {
        if let Some(last) = self.store.get_latest_summary_row(chat_id, kind)? {
            if let Ok(end) = DateTime::parse_from_rfc3339(&last.period_end) {
                let age = Utc::now().signed_duration_since(end.with_timezone(&Utc));
                if age < Duration::days(interval_days) {
                    debug!(chat_id, kind = kind.as_str(), "summary still fresh");
                    return Ok(false);
                }
            }
        }

        let until = Utc::now();
        let since = until - Duration::days(kind.window_days());
        let messages = self
            .store
            .get_messages_in_range(chat_id, since, until, TRANSCRIPT_LIMIT)?;
        if messages.is_empty() {
            return Ok(false);
        }

        let transcript = render_transcript(&messages);
        let prompt = format!(
            "Summarize the last {} days of this chat:\n\n{transcript}",
            kind.window_days()
        );
        let summary = self.provider.complete_text(SUMMARY_SYSTEM, &prompt).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Ok(false);
        }

        self.store
            .insert_chat_summary(chat_id, kind, summary, since, until)?;
        Ok(true)
    }
}

/// Render messages as a plain transcript, one line per utterance.
fn render_transcript(messages: &[StoredMessage]) -> String {
    let mut out = String::new();
    for msg in messages {
        let who = if msg.is_bot {
            "gryag".to_string()
        } else {
            speaker_label(
                msg.user_id,
                msg.display_name.as_deref(),
                msg.username.as_deref(),
            )
        };
        let text = msg.text.as_deref().unwrap_or("");
        if text.is_empty() {
            continue;
        }
        out.push_str(&format!("[{}] {}: {}\n", msg.created_at, who, text));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use gryag_agent::provider::{FunctionDecl, ModelReply, ProviderError, ReplyPart};
    use gryag_store::NewMessage;

    struct ScriptedProvider {
        script: Mutex<Vec<Result<String, ()>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn always(text: &str) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(vec![Ok(text.to_string()); 16]),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn generate(
            &self,
            _system: &str,
            _contents: &[serde_json::Value],
            _tools: &[FunctionDecl],
        ) -> Result<ModelReply, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(ModelReply {
                    parts: vec![ReplyPart::Text(text)],
                    finish_reason: "STOP".into(),
                }),
                _ => Err(ProviderError::Api {
                    status: 500,
                    message: "scripted failure".into(),
                }),
            }
        }
    }

    fn seeded_store() -> Arc<Store> {
        let store = Arc::new(Store::open_in_memory().unwrap());
        for (chat, text) in [(-10, "tabs or spaces"), (-10, "spaces obviously"), (-20, "borscht recipes")] {
            store
                .insert_message(&NewMessage {
                    chat_id: chat,
                    user_id: Some(1),
                    display_name: Some("Olena".into()),
                    text: Some(text.into()),
                    ..Default::default()
                })
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn run_once_writes_both_kinds_per_chat() {
        let store = seeded_store();
        let provider = ScriptedProvider::always("a digest");
        let scheduler =
            SummarizationScheduler::new(store.clone(), provider.clone(), 4, 3, 12);

        scheduler.run_once().await;

        for chat in [-10, -20] {
            assert_eq!(
                store.get_latest_summary(chat, SummaryKind::SevenDay).unwrap(),
                "a digest"
            );
            assert_eq!(
                store.get_latest_summary(chat, SummaryKind::ThirtyDay).unwrap(),
                "a digest"
            );
        }
    }

    #[tokio::test]
    async fn fresh_summaries_are_not_regenerated() {
        let store = seeded_store();
        let provider = ScriptedProvider::always("a digest");
        let scheduler =
            SummarizationScheduler::new(store.clone(), provider.clone(), 4, 3, 12);

        scheduler.run_once().await;
        let calls_after_first = provider.calls.load(Ordering::SeqCst);

        // Intervals have not lapsed — a second run is a no-op.
        scheduler.run_once().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn provider_failure_skips_chat_but_run_continues() {
        let store = seeded_store();
        // Script: first call fails, the rest succeed.
        let provider = Arc::new(ScriptedProvider {
            script: Mutex::new(vec![
                Ok("a digest".to_string()),
                Ok("a digest".to_string()),
                Ok("a digest".to_string()),
                Err(()),
            ]),
            calls: AtomicUsize::new(0),
        });
        let scheduler = SummarizationScheduler::new(store.clone(), provider, 4, 3, 12);

        scheduler.run_once().await;

        // Three of the four (chat, kind) pairs still landed.
        let stored: usize = [-10, -20]
            .iter()
            .flat_map(|&c| {
                [SummaryKind::SevenDay, SummaryKind::ThirtyDay]
                    .into_iter()
                    .map(move |k| (c, k))
            })
            .filter(|&(c, k)| !store.get_latest_summary(c, k).unwrap().is_empty())
            .count();
        assert_eq!(stored, 3);
    }

    #[tokio::test]
    async fn chat_without_messages_gets_no_summary() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let provider = ScriptedProvider::always("never");
        let scheduler = SummarizationScheduler::new(store.clone(), provider.clone(), 4, 3, 12);
        scheduler.run_once().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transcript_rendering() {
        let messages = vec![
            StoredMessage {
                id: 1,
                chat_id: -1,
                user_id: Some(42),
                display_name: Some("Olena".into()),
                username: None,
                text: Some("привіт".into()),
                external_message_id: None,
                media_type: String::new(),
                file_id: None,
                is_bot: false,
                request_id: None,
                throttled: false,
                reply_to_external_id: None,
                created_at: "2026-08-01T10:00:00+00:00".into(),
            },
            StoredMessage {
                id: 2,
                chat_id: -1,
                user_id: None,
                display_name: None,
                username: None,
                text: Some("вітаю".into()),
                external_message_id: None,
                media_type: String::new(),
                file_id: None,
                is_bot: true,
                request_id: None,
                throttled: false,
                reply_to_external_id: None,
                created_at: "2026-08-01T10:01:00+00:00".into(),
            },
        ];
        let transcript = render_transcript(&messages);
        assert!(transcript.contains("Olena: привіт"));
        assert!(transcript.contains("gryag: вітаю"));
    }
}
