pub mod error;
pub mod migrate;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use store::Store;
pub use types::{
    ChatSummary, MediaCacheEntry, NewMediaCacheEntry, NewMessage, SearchResult, StoredMessage,
    SummaryKind, UserFact,
};
