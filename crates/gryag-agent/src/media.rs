//! On-disk cache for generated images.
//!
//! Bytes are written to the cache directory first; the `media_cache` row
//! is inserted last and is the source of truth for expiry. If the row
//! insert fails the file is removed — an orphaned file must never outlive
//! a missing row.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use gryag_store::{NewMediaCacheEntry, Store, StoreError};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("media store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct MediaCache {
    dir: PathBuf,
    ttl_hours: i64,
}

impl MediaCache {
    pub fn new(dir: PathBuf, ttl_hours: i64) -> Self {
        Self { dir, ttl_hours }
    }

    /// Create the cache directory if missing. Called once at startup.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Persist image bytes and register them. Returns the opaque media id —
    /// the only externally usable handle.
    pub fn store_image(
        &self,
        store: &Store,
        chat_id: i64,
        user_id: Option<i64>,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let media_id = Uuid::new_v4().simple().to_string();
        self.store_image_as(store, &media_id, chat_id, user_id, bytes)?;
        Ok(media_id)
    }

    fn store_image_as(
        &self,
        store: &Store,
        media_id: &str,
        chat_id: i64,
        user_id: Option<i64>,
        bytes: &[u8],
    ) -> Result<(), MediaError> {
        let path = self.dir.join(format!("{media_id}.png"));
        std::fs::write(&path, bytes)?;

        let entry = NewMediaCacheEntry {
            media_id: media_id.to_string(),
            chat_id,
            user_id,
            file_path: path.to_string_lossy().into_owned(),
            media_type: "image".to_string(),
            expires_at: (Utc::now() + Duration::hours(self.ttl_hours)).to_rfc3339(),
        };
        if let Err(e) = store.insert_media_cache(&entry) {
            if let Err(rm) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %rm, "orphaned media file not removed");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Load a cached image by id as `(mime, base64)`. `None` when the id is
    /// unknown or expired.
    pub fn load_base64(
        &self,
        store: &Store,
        media_id: &str,
    ) -> Result<Option<(String, String)>, MediaError> {
        let Some(entry) = store.get_media_cache(media_id)? else {
            return Ok(None);
        };
        let bytes = std::fs::read(&entry.file_path)?;
        Ok(Some(("image/png".to_string(), BASE64.encode(bytes))))
    }
}
