//! User settings persisted alongside the note collections.
//!
//! Covers theme mode, reminder hours, lead minutes, and timezone.
//! Defaults match the stock reminder schedule.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::blob::{BlobStore, KEY_SETTINGS};
use super::StoreError;
use crate::domain::LocalClock;
use crate::reminder::ReminderPolicy;

/// Display theme preference (rendering is a collaborator concern; the
/// engine only stores the choice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    Light,
    Dark,
    System,
}

impl Default for ThemeMode {
    fn default() -> Self {
        Self::System
    }
}

/// Persisted user settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme: ThemeMode,

    /// Reminder hour for `today` notes without a due date (default: 18)
    #[serde(default = "default_today_hour")]
    pub today_hour: u32,

    /// Reminder hour for `tomorrow` notes (default: 9)
    #[serde(default = "default_tomorrow_hour")]
    pub tomorrow_hour: u32,

    /// Reminder hour for `shopping` notes (default: 10)
    #[serde(default = "default_shopping_hour")]
    pub shopping_hour: u32,

    /// Minutes before a due date at which a reminder fires (default: 15)
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: i64,

    /// IANA timezone name, passed through to the remote services
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// UTC offset in minutes for local rendering
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_today_hour() -> u32 {
    18
}
fn default_tomorrow_hour() -> u32 {
    9
}
fn default_shopping_hour() -> u32 {
    10
}
fn default_lead_minutes() -> i64 {
    15
}
fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            today_hour: default_today_hour(),
            tomorrow_hour: default_tomorrow_hour(),
            shopping_hour: default_shopping_hour(),
            lead_minutes: default_lead_minutes(),
            timezone: default_timezone(),
            utc_offset_minutes: 0,
        }
    }
}

impl Settings {
    /// Load settings; a missing blob yields the defaults.
    pub fn load(blob: &Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        match blob.get(KEY_SETTINGS)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Self::default()),
        }
    }

    /// Persist the settings record.
    pub fn save(&self, blob: &Arc<dyn BlobStore>) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        blob.put(KEY_SETTINGS, &json)
    }

    /// Local clock derived from the stored timezone and offset.
    pub fn clock(&self) -> LocalClock {
        LocalClock::new(self.timezone.clone(), self.utc_offset_minutes)
    }

    /// Reminder policy derived from the stored hours and lead minutes.
    pub fn reminder_policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            lead_minutes: self.lead_minutes,
            today_hour: self.today_hour,
            tomorrow_hour: self.tomorrow_hour,
            shopping_hour: self.shopping_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::blob::MemoryBlobStore;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.today_hour, 18);
        assert_eq!(settings.tomorrow_hour, 9);
        assert_eq!(settings.shopping_hour, 10);
        assert_eq!(settings.lead_minutes, 15);
        assert_eq!(settings.theme, ThemeMode::System);
    }

    #[test]
    fn test_missing_blob_yields_defaults() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let settings = Settings::load(&blob).unwrap();
        assert_eq!(settings.today_hour, 18);
    }

    #[test]
    fn test_save_and_reload() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());

        let mut settings = Settings::default();
        settings.today_hour = 20;
        settings.timezone = "America/New_York".to_string();
        settings.utc_offset_minutes = -300;
        settings.save(&blob).unwrap();

        let reloaded = Settings::load(&blob).unwrap();
        assert_eq!(reloaded.today_hour, 20);
        assert_eq!(reloaded.timezone, "America/New_York");
        assert_eq!(reloaded.clock().offset.local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        blob.put(KEY_SETTINGS, r#"{"todayHour": 19}"#).unwrap();

        let settings = Settings::load(&blob).unwrap();
        assert_eq!(settings.today_hour, 19);
        assert_eq!(settings.tomorrow_hour, 9);
        assert_eq!(settings.timezone, "UTC");
    }
}
