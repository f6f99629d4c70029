//! Caller-supplied local time context.
//!
//! The engine never derives a timezone on its own: every local
//! rendering and local-time computation goes through a `LocalClock`
//! built from the configured IANA zone name and UTC offset. Due dates
//! stay UTC-normalized in storage and on the wire.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Local time context for one session.
#[derive(Debug, Clone)]
pub struct LocalClock {
    /// IANA zone name, passed through to the remote services
    pub timezone: String,

    /// Fixed UTC offset used for all local conversions
    pub offset: FixedOffset,
}

impl LocalClock {
    /// Build a clock from a zone name and a UTC offset in minutes.
    ///
    /// Offsets outside ±24h clamp to UTC.
    pub fn new(timezone: impl Into<String>, offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self {
            timezone: timezone.into(),
            offset,
        }
    }

    /// A UTC clock, for tests and offset-less configs.
    pub fn utc() -> Self {
        Self::new("UTC", 0)
    }

    /// Current wall-clock time in the local zone.
    pub fn now_local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    /// Convert a UTC instant to local wall-clock time.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }

    /// Convert local wall-clock time back to a UTC instant.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        (local - self.offset).and_utc()
    }

    /// Render a UTC instant the way the user sees it, e.g.
    /// `Tue Mar 3, 2:30 PM`. This exact rendering is what the
    /// interpreter embeds in prompts and responses.
    pub fn render_local(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%a %b %-d, %-I:%M %p")
            .to_string()
    }
}
