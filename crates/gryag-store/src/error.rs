use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration {version} failed: {reason}")]
    Migration { version: String, reason: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
