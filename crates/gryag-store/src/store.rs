//! SQLite-backed persistent store.
//!
//! Owns the `messages` (+ FTS5 index), `user_facts`, `chat_summaries`, and
//! `media_cache` tables. All timestamps are RFC 3339 UTC strings, written
//! exclusively by the store so lexicographic comparison is valid in SQL.
//! The FTS index is an external-content table synced manually on every
//! insert and delete.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;
use crate::migrate::migrate;
use crate::types::*;

/// Hard cap applied to range queries regardless of what callers ask for.
const MAX_RANGE_LIMIT: usize = 2000;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: &str) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store with full schema. Used by tests and the sandboxed
    /// dev profile.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── messages ───────────────────────────────────────────────────────────

    /// Append one message row. Returns the new monotonic id.
    pub fn insert_message(&self, msg: &NewMessage) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO messages
             (chat_id, user_id, display_name, username, text,
              external_message_id, media_type, file_id, is_bot,
              request_id, throttled, reply_to_external_id, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
            rusqlite::params![
                msg.chat_id,
                msg.user_id,
                msg.display_name,
                msg.username,
                msg.text,
                msg.external_message_id,
                msg.media_type,
                msg.file_id,
                msg.is_bot,
                msg.request_id,
                msg.throttled,
                msg.reply_to_external_id,
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO messages_fts(rowid, text) VALUES (?1, ?2)",
            rusqlite::params![id, msg.text.as_deref().unwrap_or("")],
        )?;
        Ok(id)
    }

    /// Up to `limit` most recent messages for a chat, oldest first.
    pub fn get_recent_messages(&self, chat_id: i64, limit: usize) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, user_id, display_name, username, text,
                    external_message_id, media_type, file_id, is_bot,
                    request_id, throttled, reply_to_external_id, created_at
             FROM messages WHERE chat_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![chat_id, limit], row_to_message)?;
        let mut msgs: Vec<StoredMessage> = rows.filter_map(|r| r.ok()).collect();
        msgs.reverse();
        Ok(msgs)
    }

    /// Messages within `[since, until)` for a chat, oldest first, capped.
    pub fn get_messages_in_range(
        &self,
        chat_id: i64,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, user_id, display_name, username, text,
                    external_message_id, media_type, file_id, is_bot,
                    request_id, throttled, reply_to_external_id, created_at
             FROM messages
             WHERE chat_id = ?1 AND created_at >= ?2 AND created_at < ?3
             ORDER BY id ASC LIMIT ?4",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![
                chat_id,
                since.to_rfc3339(),
                until.to_rfc3339(),
                limit.min(MAX_RANGE_LIMIT),
            ],
            row_to_message,
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Distinct chat ids with any message in the last `since`, ordered by
    /// most recent activity first.
    pub fn get_recent_chat_ids(&self, since: Duration) -> Result<Vec<i64>> {
        let cutoff = (Utc::now() - since).to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT chat_id, MAX(created_at) AS last_seen
             FROM messages WHERE created_at >= ?1
             GROUP BY chat_id ORDER BY last_seen DESC",
        )?;
        let rows = stmt.query_map([cutoff], |row| row.get::<_, i64>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Most recent human (non-bot) sender in a chat, if any.
    pub fn get_last_human_sender(
        &self,
        chat_id: i64,
    ) -> Result<Option<(i64, Option<String>, Option<String>)>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT user_id, display_name, username FROM messages
                 WHERE chat_id = ?1 AND is_bot = 0 AND user_id IS NOT NULL
                 ORDER BY id DESC LIMIT 1",
                [chat_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(row)
    }

    /// Delete messages older than `retention_days`. No-op when ≤ 0.
    /// Keeps the FTS index consistent row by row.
    pub fn prune_old_messages(&self, retention_days: i64) -> Result<usize> {
        if retention_days <= 0 {
            return Ok(0);
        }
        let cutoff = (Utc::now() - Duration::days(retention_days)).to_rfc3339();
        let conn = self.conn.lock().unwrap();

        let doomed: Vec<(i64, String)> = {
            let mut stmt = conn.prepare(
                "SELECT id, COALESCE(text, '') FROM messages WHERE created_at < ?1",
            )?;
            let rows = stmt.query_map([&cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.filter_map(|r| r.ok()).collect()
        };

        for (id, text) in &doomed {
            conn.execute(
                "INSERT INTO messages_fts(messages_fts, rowid, text) VALUES('delete', ?1, ?2)",
                rusqlite::params![id, text],
            )?;
        }
        let deleted = conn.execute("DELETE FROM messages WHERE created_at < ?1", [&cutoff])?;
        debug!(deleted, "old messages pruned");
        Ok(deleted)
    }

    // ── full-text search ───────────────────────────────────────────────────

    /// Full-text search scoped to one chat. Terms are whitespace-split,
    /// AND-joined, and prefix-matched; ranked by relevance then recency.
    /// `limit` 0 means the default of 10; any value is clamped to [1, 50].
    pub fn search_messages(
        &self,
        chat_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let fts_query = match build_fts_query(query) {
            Some(q) => q,
            None => return Ok(Vec::new()),
        };
        let limit = if limit == 0 { 10 } else { limit.clamp(1, 50) };

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT m.chat_id, m.external_message_id, COALESCE(m.text, ''), m.created_at
             FROM messages m JOIN messages_fts f ON m.id = f.rowid
             WHERE m.chat_id = ?1 AND messages_fts MATCH ?2
             ORDER BY rank, m.created_at DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(rusqlite::params![chat_id, fts_query, limit], |row| {
            let chat_id: i64 = row.get(0)?;
            let message_id: Option<i64> = row.get(1)?;
            Ok(SearchResult {
                chat_id,
                message_id,
                text: row.get(2)?,
                created_at: row.get(3)?,
                message_link: message_id
                    .map(|mid| deep_link(chat_id, mid))
                    .unwrap_or_default(),
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ── user facts ─────────────────────────────────────────────────────────

    /// Insert a fact about a user. Deduplicated on the SHA-256 of the
    /// trimmed text within (chat, user); a duplicate returns 0.
    pub fn insert_user_fact(&self, chat_id: i64, user_id: i64, text: &str) -> Result<i64> {
        let trimmed = text.trim();
        let hash = fact_hash(trimmed);
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO user_facts
             (chat_id, user_id, fact_text, fact_hash, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?5)",
            rusqlite::params![chat_id, user_id, trimmed, hash, now],
        )?;
        if changed == 0 {
            return Ok(0);
        }
        Ok(conn.last_insert_rowid())
    }

    /// All facts about a user in a chat, oldest first.
    pub fn get_user_facts(&self, chat_id: i64, user_id: i64) -> Result<Vec<UserFact>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, chat_id, user_id, fact_text, created_at, updated_at
             FROM user_facts WHERE chat_id = ?1 AND user_id = ?2
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![chat_id, user_id], |row| {
            Ok(UserFact {
                id: row.get(0)?,
                chat_id: row.get(1)?,
                user_id: row.get(2)?,
                fact_text: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn delete_user_fact(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM user_facts WHERE id = ?1", [id])?;
        Ok(n > 0)
    }

    // ── chat summaries ─────────────────────────────────────────────────────

    pub fn insert_chat_summary(
        &self,
        chat_id: i64,
        kind: SummaryKind,
        text: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_summaries
             (chat_id, summary_type, summary_text, period_start, period_end, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            rusqlite::params![
                chat_id,
                kind.as_str(),
                text,
                period_start.to_rfc3339(),
                period_end.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Latest summary row of a kind for a chat (by period end), if any.
    pub fn get_latest_summary_row(
        &self,
        chat_id: i64,
        kind: SummaryKind,
    ) -> Result<Option<ChatSummary>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, chat_id, summary_type, summary_text,
                        period_start, period_end, created_at
                 FROM chat_summaries
                 WHERE chat_id = ?1 AND summary_type = ?2
                 ORDER BY period_end DESC LIMIT 1",
                rusqlite::params![chat_id, kind.as_str()],
                |row| {
                    Ok(ChatSummary {
                        id: row.get(0)?,
                        chat_id: row.get(1)?,
                        summary_type: row.get(2)?,
                        summary_text: row.get(3)?,
                        period_start: row.get(4)?,
                        period_end: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(row)
    }

    /// Latest summary text, empty string when none exists.
    pub fn get_latest_summary(&self, chat_id: i64, kind: SummaryKind) -> Result<String> {
        Ok(self
            .get_latest_summary_row(chat_id, kind)?
            .map(|s| s.summary_text)
            .unwrap_or_default())
    }

    // ── media cache ────────────────────────────────────────────────────────

    pub fn insert_media_cache(&self, entry: &NewMediaCacheEntry) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO media_cache
             (media_id, chat_id, user_id, file_path, media_type, expires_at, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            rusqlite::params![
                entry.media_id,
                entry.chat_id,
                entry.user_id,
                entry.file_path,
                entry.media_type,
                entry.expires_at,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Look up an unexpired cache entry by its opaque id.
    pub fn get_media_cache(&self, media_id: &str) -> Result<Option<MediaCacheEntry>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, media_id, chat_id, user_id, file_path,
                        media_type, expires_at, created_at
                 FROM media_cache WHERE media_id = ?1 AND expires_at > ?2",
                rusqlite::params![media_id, Utc::now().to_rfc3339()],
                row_to_media_entry,
            )
            .map(Some)
            .or_else(ignore_no_rows)?;
        Ok(row)
    }

    /// All expired entries. Callers delete the files first, then the rows
    /// via [`Store::delete_media_cache`] — the row stays authoritative for
    /// expiry until the file is gone.
    pub fn get_expired_media(&self) -> Result<Vec<MediaCacheEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, media_id, chat_id, user_id, file_path,
                    media_type, expires_at, created_at
             FROM media_cache WHERE expires_at <= ?1",
        )?;
        let rows = stmt.query_map([Utc::now().to_rfc3339()], row_to_media_entry)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn delete_media_cache(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM media_cache WHERE id = ?1", [id])?;
        Ok(())
    }
}

/// SHA-256 hex digest of a fact's trimmed text. Case and inner whitespace
/// are preserved — only the ends are trimmed before hashing.
pub fn fact_hash(trimmed_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(trimmed_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Normalize a user query into an FTS5 MATCH expression: each whitespace
/// token becomes a quoted prefix term, tokens are AND-joined. Returns
/// `None` for a blank query.
fn build_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("\"{}\"*", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" AND "))
    }
}

fn ignore_no_rows<T>(e: rusqlite::Error) -> Result<Option<T>> {
    match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other.into()),
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        user_id: row.get(2)?,
        display_name: row.get(3)?,
        username: row.get(4)?,
        text: row.get(5)?,
        external_message_id: row.get(6)?,
        media_type: row.get(7)?,
        file_id: row.get(8)?,
        is_bot: row.get(9)?,
        request_id: row.get(10)?,
        throttled: row.get(11)?,
        reply_to_external_id: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn row_to_media_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaCacheEntry> {
    Ok(MediaCacheEntry {
        id: row.get(0)?,
        media_id: row.get(1)?,
        chat_id: row.get(2)?,
        user_id: row.get(3)?,
        file_path: row.get(4)?,
        media_type: row.get(5)?,
        expires_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    fn user_msg(chat_id: i64, user_id: i64, text: &str, external_id: i64) -> NewMessage {
        NewMessage {
            chat_id,
            user_id: Some(user_id),
            text: Some(text.to_string()),
            external_message_id: Some(external_id),
            ..Default::default()
        }
    }

    #[test]
    fn message_ids_are_monotonic() {
        let s = store();
        let a = s.insert_message(&user_msg(-1, 1, "first", 1)).unwrap();
        let b = s.insert_message(&user_msg(-1, 1, "second", 2)).unwrap();
        let c = s.insert_message(&user_msg(-2, 1, "other chat", 3)).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn recent_messages_oldest_first() {
        let s = store();
        for i in 0..5 {
            s.insert_message(&user_msg(-1, 1, &format!("m{i}"), i)).unwrap();
        }
        let got = s.get_recent_messages(-1, 3).unwrap();
        let texts: Vec<_> = got.iter().map(|m| m.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn recent_messages_scoped_to_chat() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "mine", 1)).unwrap();
        s.insert_message(&user_msg(-2, 1, "theirs", 2)).unwrap();
        let got = s.get_recent_messages(-1, 10).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text.as_deref(), Some("mine"));
    }

    #[test]
    fn fact_dedup_round_trip() {
        let s = store();
        let first = s.insert_user_fact(-1, 42, "loves coffee").unwrap();
        assert!(first > 0);
        // Same fact, stray whitespace — still a duplicate.
        let second = s.insert_user_fact(-1, 42, "  loves coffee \n").unwrap();
        assert_eq!(second, 0);

        let facts = s.get_user_facts(-1, 42).unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].fact_text, "loves coffee");

        // Same text for a different user is a fresh fact.
        assert!(s.insert_user_fact(-1, 43, "loves coffee").unwrap() > 0);
    }

    #[test]
    fn fact_delete() {
        let s = store();
        let id = s.insert_user_fact(-1, 42, "vegan").unwrap();
        assert!(s.delete_user_fact(id).unwrap());
        assert!(!s.delete_user_fact(id).unwrap());
        assert!(s.get_user_facts(-1, 42).unwrap().is_empty());
    }

    #[test]
    fn latest_summary_by_period_end() {
        let s = store();
        let t0 = Utc::now() - Duration::days(20);
        let t1 = Utc::now() - Duration::days(10);
        let t2 = Utc::now();
        s.insert_chat_summary(-1, SummaryKind::SevenDay, "older", t0, t1)
            .unwrap();
        s.insert_chat_summary(-1, SummaryKind::SevenDay, "newer", t1, t2)
            .unwrap();
        s.insert_chat_summary(-1, SummaryKind::ThirtyDay, "monthly", t0, t2)
            .unwrap();

        assert_eq!(
            s.get_latest_summary(-1, SummaryKind::SevenDay).unwrap(),
            "newer"
        );
        assert_eq!(
            s.get_latest_summary(-1, SummaryKind::ThirtyDay).unwrap(),
            "monthly"
        );
        assert_eq!(s.get_latest_summary(-2, SummaryKind::SevenDay).unwrap(), "");
    }

    #[test]
    fn search_scoped_ranked_and_linked() {
        let s = store();
        let chat = -1002604868951;
        s.insert_message(&user_msg(chat, 1, "привіт світ", 101)).unwrap();
        s.insert_message(&user_msg(chat, 1, "hello world", 102)).unwrap();
        s.insert_message(&user_msg(chat, 2, "world cup", 103)).unwrap();
        // Same text in another chat must not leak in.
        s.insert_message(&user_msg(-5, 1, "hello world", 104)).unwrap();

        let hits = s.search_messages(chat, "world", 10).unwrap();
        assert_eq!(hits.len(), 2);
        for hit in &hits {
            let mid = hit.message_id.unwrap();
            assert_eq!(
                hit.message_link,
                format!("https://t.me/c/2604868951/{mid}")
            );
        }
        let texts: Vec<_> = hits.iter().map(|h| h.text.clone()).collect();
        assert!(texts.contains(&"hello world".to_string()));
        assert!(texts.contains(&"world cup".to_string()));
    }

    #[test]
    fn search_terms_are_and_joined_with_prefix() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "deploy the gateway service", 1))
            .unwrap();
        s.insert_message(&user_msg(-1, 1, "deploy everything", 2)).unwrap();

        let hits = s.search_messages(-1, "deploy gate", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "deploy the gateway service");
    }

    #[test]
    fn search_blank_query_is_empty() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "anything", 1)).unwrap();
        assert!(s.search_messages(-1, "   ", 10).unwrap().is_empty());
    }

    #[test]
    fn search_limit_clamped() {
        let s = store();
        for i in 0..60 {
            s.insert_message(&user_msg(-1, 1, &format!("cat {i}"), i)).unwrap();
        }
        assert_eq!(s.search_messages(-1, "cat", 0).unwrap().len(), 10);
        assert_eq!(s.search_messages(-1, "cat", 500).unwrap().len(), 50);
        assert_eq!(s.search_messages(-1, "cat", 3).unwrap().len(), 3);
    }

    #[test]
    fn prune_noop_when_disabled() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "keep me", 1)).unwrap();
        assert_eq!(s.prune_old_messages(0).unwrap(), 0);
        assert_eq!(s.prune_old_messages(-5).unwrap(), 0);
        assert_eq!(s.get_recent_messages(-1, 10).unwrap().len(), 1);
    }

    #[test]
    fn prune_removes_old_rows_and_fts() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "ancient text", 1)).unwrap();
        // Backdate the row past the retention window.
        {
            let conn = s.conn.lock().unwrap();
            let old = (Utc::now() - Duration::days(100)).to_rfc3339();
            conn.execute("UPDATE messages SET created_at = ?1", [&old]).unwrap();
        }
        s.insert_message(&user_msg(-1, 1, "fresh text", 2)).unwrap();

        assert_eq!(s.prune_old_messages(90).unwrap(), 1);
        assert_eq!(s.get_recent_messages(-1, 10).unwrap().len(), 1);
        // The pruned row must be gone from the search index too.
        assert!(s.search_messages(-1, "ancient", 10).unwrap().is_empty());
        assert_eq!(s.search_messages(-1, "fresh", 10).unwrap().len(), 1);
    }

    #[test]
    fn media_cache_expiry_filter() {
        let s = store();
        let live = NewMediaCacheEntry {
            media_id: "live-token".into(),
            chat_id: -1,
            user_id: Some(42),
            file_path: "/tmp/x/live.png".into(),
            media_type: "image".into(),
            expires_at: (Utc::now() + Duration::hours(48)).to_rfc3339(),
        };
        let dead = NewMediaCacheEntry {
            media_id: "dead-token".into(),
            expires_at: (Utc::now() - Duration::hours(1)).to_rfc3339(),
            ..live.clone()
        };
        s.insert_media_cache(&live).unwrap();
        let dead_row = s.insert_media_cache(&dead).unwrap();

        assert!(s.get_media_cache("live-token").unwrap().is_some());
        assert!(s.get_media_cache("dead-token").unwrap().is_none());
        assert!(s.get_media_cache("never-was").unwrap().is_none());

        let expired = s.get_expired_media().unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, dead_row);
        s.delete_media_cache(dead_row).unwrap();
        assert!(s.get_expired_media().unwrap().is_empty());
    }

    #[test]
    fn media_id_must_be_unique() {
        let s = store();
        let entry = NewMediaCacheEntry {
            media_id: "tok".into(),
            chat_id: -1,
            user_id: None,
            file_path: "/tmp/a".into(),
            media_type: "image".into(),
            expires_at: (Utc::now() + Duration::hours(1)).to_rfc3339(),
        };
        s.insert_media_cache(&entry).unwrap();
        assert!(s.insert_media_cache(&entry).is_err());
    }

    #[test]
    fn range_query_bounds() {
        let s = store();
        s.insert_message(&user_msg(-1, 1, "inside", 1)).unwrap();
        let since = Utc::now() - Duration::hours(1);
        let until = Utc::now() + Duration::hours(1);
        assert_eq!(s.get_messages_in_range(-1, since, until, 100).unwrap().len(), 1);

        let past_until = Utc::now() - Duration::minutes(30);
        assert!(s
            .get_messages_in_range(-1, since, past_until, 100)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn recent_chat_ids_ordered_by_activity() {
        let s = store();
        s.insert_message(&user_msg(-10, 1, "a", 1)).unwrap();
        s.insert_message(&user_msg(-20, 1, "b", 2)).unwrap();
        // Chat -20 backdated so -10 is the most recently active.
        {
            let conn = s.conn.lock().unwrap();
            let old = (Utc::now() - Duration::days(2)).to_rfc3339();
            conn.execute("UPDATE messages SET created_at = ?1 WHERE chat_id = -20", [&old])
                .unwrap();
        }
        let ids = s.get_recent_chat_ids(Duration::days(7)).unwrap();
        assert_eq!(ids, vec![-10, -20]);

        let recent_only = s.get_recent_chat_ids(Duration::days(1)).unwrap();
        assert_eq!(recent_only, vec![-10]);
    }

    #[test]
    fn last_human_sender_skips_bot_rows() {
        let s = store();
        s.insert_message(&NewMessage {
            chat_id: -1,
            user_id: Some(42),
            display_name: Some("Olena".into()),
            text: Some("hi".into()),
            ..Default::default()
        })
        .unwrap();
        s.insert_message(&NewMessage {
            chat_id: -1,
            is_bot: true,
            text: Some("hello!".into()),
            ..Default::default()
        })
        .unwrap();

        let (uid, name, _) = s.get_last_human_sender(-1).unwrap().unwrap();
        assert_eq!(uid, 42);
        assert_eq!(name.as_deref(), Some("Olena"));
        assert!(s.get_last_human_sender(-99).unwrap().is_none());
    }
}
