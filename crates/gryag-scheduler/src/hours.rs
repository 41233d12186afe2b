//! Kyiv wall-clock gating for the proactive scheduler.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

const KYIV: Tz = chrono_tz::Europe::Kyiv;

/// Current time in Kyiv, DST-aware.
pub fn kyiv_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&KYIV)
}

/// An `[start, end)` hour window that may wrap past midnight (`22-6`).
#[derive(Debug, Clone, Copy)]
pub struct ActiveHours {
    start: u8,
    end: u8,
}

impl ActiveHours {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn from_pair((start, end): (u8, u8)) -> Self {
        Self::new(start, end)
    }

    /// Whether `hour` falls inside the window. Equal endpoints are read as
    /// a full 24-hour window.
    pub fn contains(&self, hour: u32) -> bool {
        let (start, end) = (self.start as u32, self.end as u32);
        match start.cmp(&end) {
            std::cmp::Ordering::Less => start <= hour && hour < end,
            std::cmp::Ordering::Greater => hour >= start || hour < end,
            std::cmp::Ordering::Equal => true,
        }
    }
}
