//! Background schedulers: proactive outreach and rolling summarization.
//!
//! Both run as long-lived tasks driven by a tokio interval and exit
//! promptly when the shutdown watch flips.

pub mod hours;
pub mod proactive;
pub mod summarize;

use thiserror::Error;

pub use hours::ActiveHours;
pub use proactive::ProactiveScheduler;
pub use summarize::SummarizationScheduler;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] gryag_store::StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] gryag_agent::ProviderError),
}
