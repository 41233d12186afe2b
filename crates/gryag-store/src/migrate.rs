//! Versioned schema migrations.
//!
//! Each migration is an embedded `.up.sql` file. Files are applied in
//! lexicographic order, one transaction per file, and recorded in
//! `schema_migrations` by filename-without-extension. Already-applied
//! versions are skipped, so calling [`migrate`] on every startup is safe.
//! A failing migration rolls back and propagates — startup must abort.

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_messages",
        include_str!("../migrations/0001_messages.up.sql"),
    ),
    (
        "0002_facts_and_summaries",
        include_str!("../migrations/0002_facts_and_summaries.up.sql"),
    ),
    (
        "0003_media_cache",
        include_str!("../migrations/0003_media_cache.up.sql"),
    ),
];

/// Apply all pending migrations. Returns the number applied.
pub fn migrate(conn: &mut Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut applied = 0usize;
    for (version, sql) in MIGRATIONS {
        let already: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
            [version],
            |row| row.get(0),
        )?;
        if already {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| StoreError::Migration {
            version: version.to_string(),
            reason: e.to_string(),
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(%version, "migration applied");
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_lexicographically_sorted() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn migrate_twice_applies_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        let first = migrate(&mut conn).unwrap();
        assert_eq!(first, MIGRATIONS.len());

        let second = migrate(&mut conn).unwrap();
        assert_eq!(second, 0);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows as usize, MIGRATIONS.len());
    }

    #[test]
    fn tables_exist_after_migrate() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        for table in ["messages", "user_facts", "chat_summaries", "media_cache"] {
            let found: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert!(found, "missing table {table}");
        }
    }
}
