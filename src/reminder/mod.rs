//! Reminder trigger computation and scheduling bookkeeping.
//!
//! Delivery itself is a collaborator behind `ReminderBackend`; this
//! module owns the trigger-time rules and the persisted note-id →
//! handle map that keeps at most one outstanding reminder per note.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::domain::{Category, LocalClock, Note};
use crate::store::blob::{BlobStore, KEY_REMINDERS};

/// Hours and lead minutes driving the trigger rules.
#[derive(Debug, Clone)]
pub struct ReminderPolicy {
    /// Minutes before a due date at which the reminder fires
    pub lead_minutes: i64,

    /// Hour for `today` notes without a due date
    pub today_hour: u32,

    /// Hour for `tomorrow` notes
    pub tomorrow_hour: u32,

    /// Hour (next calendar day) for `shopping` notes
    pub shopping_hour: u32,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            lead_minutes: 15,
            today_hour: 18,
            tomorrow_hour: 9,
            shopping_hour: 10,
        }
    }
}

/// Compute the local trigger time for a note, or `None` when no
/// reminder applies.
///
/// Rules:
/// - a due date wins: trigger = due − lead minutes, skipped entirely
///   if already past;
/// - `today` → today at the configured hour, or one hour from now if
///   that hour has passed;
/// - `tomorrow` → tomorrow at the configured hour;
/// - `shopping` → next calendar day at the configured hour;
/// - `idea`/`other` → no reminder.
pub fn trigger_time(
    category: Category,
    due_local: Option<NaiveDateTime>,
    now_local: NaiveDateTime,
    policy: &ReminderPolicy,
) -> Option<NaiveDateTime> {
    if let Some(due) = due_local {
        let trigger = due - Duration::minutes(policy.lead_minutes);
        return (trigger > now_local).then_some(trigger);
    }

    match category {
        Category::Today => {
            let at = now_local.date().and_hms_opt(policy.today_hour, 0, 0)?;
            if at > now_local {
                Some(at)
            } else {
                Some(now_local + Duration::hours(1))
            }
        }
        Category::Tomorrow => now_local
            .date()
            .succ_opt()?
            .and_hms_opt(policy.tomorrow_hour, 0, 0),
        Category::Shopping => now_local
            .date()
            .succ_opt()?
            .and_hms_opt(policy.shopping_hour, 0, 0),
        Category::Idea | Category::Other => None,
    }
}

/// Delivery collaborator: turns a trigger time into a platform
/// notification and back.
#[async_trait]
pub trait ReminderBackend: Send + Sync {
    /// Register a notification; returns an opaque handle.
    async fn schedule(&self, note: &Note, trigger_local: NaiveDateTime) -> Result<String>;

    /// Cancel a previously returned handle.
    async fn cancel(&self, handle: &str) -> Result<()>;
}

/// Backend that only logs. Stands in when no notification surface is
/// wired up.
#[derive(Debug, Default)]
pub struct LogReminderBackend;

#[async_trait]
impl ReminderBackend for LogReminderBackend {
    async fn schedule(&self, note: &Note, trigger_local: NaiveDateTime) -> Result<String> {
        let handle = Uuid::new_v4().to_string();
        tracing::info!(
            "Reminder for '{}' at {} (handle {})",
            note.title,
            trigger_local,
            handle
        );
        Ok(handle)
    }

    async fn cancel(&self, handle: &str) -> Result<()> {
        tracing::info!("Cancelled reminder handle {}", handle);
        Ok(())
    }
}

/// Scheduler: trigger rules + the persisted id→handle map.
pub struct ReminderScheduler {
    blob: Arc<dyn BlobStore>,
    backend: Arc<dyn ReminderBackend>,
    policy: ReminderPolicy,
    handles: HashMap<Uuid, String>,
}

impl ReminderScheduler {
    /// Load the handle map; a missing blob means no outstanding
    /// reminders.
    pub fn load(
        blob: Arc<dyn BlobStore>,
        backend: Arc<dyn ReminderBackend>,
        policy: ReminderPolicy,
    ) -> Result<Self> {
        let handles = match blob.get(KEY_REMINDERS).context("Failed to read reminder map")? {
            Some(json) => {
                serde_json::from_str(&json).context("Failed to parse reminder map")?
            }
            None => HashMap::new(),
        };
        Ok(Self {
            blob,
            backend,
            policy,
            handles,
        })
    }

    fn persist_and_commit(&mut self, next: HashMap<Uuid, String>) -> Result<()> {
        let json = serde_json::to_string(&next).context("Failed to serialize reminder map")?;
        self.blob
            .put(KEY_REMINDERS, &json)
            .context("Failed to persist reminder map")?;
        self.handles = next;
        Ok(())
    }

    /// Schedule (or re-schedule) the reminder for a note.
    ///
    /// Any prior handle for the same note id is cancelled first, so at
    /// most one reminder is ever outstanding per note. Returns the
    /// local trigger time, or `None` when no reminder applies.
    pub async fn schedule_for(
        &mut self,
        note: &Note,
        clock: &LocalClock,
    ) -> Result<Option<NaiveDateTime>> {
        self.cancel_for(note.id).await?;

        let due_local = note.due_date.map(|due| clock.to_local(due));
        let trigger = match trigger_time(note.category, due_local, clock.now_local(), &self.policy)
        {
            Some(t) => t,
            None => return Ok(None),
        };

        let handle = self.backend.schedule(note, trigger).await?;
        let mut next = self.handles.clone();
        next.insert(note.id, handle);
        self.persist_and_commit(next)?;

        Ok(Some(trigger))
    }

    /// Cancel the outstanding reminder for a note id, if any.
    ///
    /// Called when a note is completed, deleted, or archived.
    /// Unarchiving does not reschedule.
    pub async fn cancel_for(&mut self, note_id: Uuid) -> Result<()> {
        let handle = match self.handles.get(&note_id) {
            Some(h) => h.clone(),
            None => return Ok(()),
        };

        self.backend.cancel(&handle).await?;
        let mut next = self.handles.clone();
        next.remove(&note_id);
        self.persist_and_commit(next)?;
        Ok(())
    }

    /// The note id the given outstanding handle belongs to, if any.
    pub fn handle_for(&self, note_id: Uuid) -> Option<&str> {
        self.handles.get(&note_id).map(String::as_str)
    }

    /// Number of outstanding reminders.
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NoteDraft;
    use crate::store::blob::MemoryBlobStore;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn local(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_due_date_minus_lead() {
        let policy = ReminderPolicy::default();
        let trigger = trigger_time(
            Category::Today,
            Some(local(15, 0)),
            local(9, 0),
            &policy,
        );
        assert_eq!(trigger, Some(local(14, 45)));
    }

    #[test]
    fn test_past_due_date_schedules_nothing() {
        let policy = ReminderPolicy::default();
        let trigger = trigger_time(
            Category::Today,
            Some(local(9, 10)),
            local(9, 0),
            &policy,
        );
        // 9:10 - 15min = 8:55, already past
        assert_eq!(trigger, None);
    }

    #[test]
    fn test_today_before_hour() {
        let policy = ReminderPolicy::default();
        let trigger = trigger_time(Category::Today, None, local(9, 0), &policy);
        assert_eq!(trigger, Some(local(18, 0)));
    }

    #[test]
    fn test_today_after_hour_is_one_hour_from_now() {
        let policy = ReminderPolicy::default();
        let trigger = trigger_time(Category::Today, None, local(19, 0), &policy);
        assert_eq!(trigger, Some(local(20, 0)));
    }

    #[test]
    fn test_tomorrow_and_shopping_next_day() {
        let policy = ReminderPolicy::default();
        let next_day = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();

        assert_eq!(
            trigger_time(Category::Tomorrow, None, local(19, 0), &policy),
            next_day.and_hms_opt(9, 0, 0)
        );
        assert_eq!(
            trigger_time(Category::Shopping, None, local(19, 0), &policy),
            next_day.and_hms_opt(10, 0, 0)
        );
    }

    #[test]
    fn test_idea_and_other_get_no_reminder() {
        let policy = ReminderPolicy::default();
        assert_eq!(trigger_time(Category::Idea, None, local(9, 0), &policy), None);
        assert_eq!(trigger_time(Category::Other, None, local(9, 0), &policy), None);
    }

    /// Backend that records calls for assertions.
    #[derive(Default)]
    struct RecordingBackend {
        scheduled: Mutex<Vec<String>>,
        cancelled: Mutex<Vec<String>>,
        counter: Mutex<u32>,
    }

    #[async_trait]
    impl ReminderBackend for RecordingBackend {
        async fn schedule(&self, _note: &Note, _trigger: NaiveDateTime) -> Result<String> {
            let mut counter = self.counter.lock().unwrap();
            *counter += 1;
            let handle = format!("handle-{}", counter);
            self.scheduled.lock().unwrap().push(handle.clone());
            Ok(handle)
        }

        async fn cancel(&self, handle: &str) -> Result<()> {
            self.cancelled.lock().unwrap().push(handle.to_string());
            Ok(())
        }
    }

    fn due_note(hours_ahead: i64) -> Note {
        Note::from_draft(NoteDraft {
            raw_text: "dentist at three".to_string(),
            title: "Dentist appointment".to_string(),
            category: Category::Today,
            due_date: Some(chrono::Utc::now() + Duration::hours(hours_ahead)),
            entities: Vec::new(),
            tags: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_reschedule_cancels_prior_handle() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let backend = Arc::new(RecordingBackend::default());
        let mut scheduler =
            ReminderScheduler::load(blob, backend.clone(), ReminderPolicy::default()).unwrap();

        let clock = LocalClock::utc();
        let note = due_note(6);

        scheduler.schedule_for(&note, &clock).await.unwrap();
        scheduler.schedule_for(&note, &clock).await.unwrap();

        assert_eq!(scheduler.outstanding(), 1);
        assert_eq!(backend.scheduled.lock().unwrap().len(), 2);
        assert_eq!(
            backend.cancelled.lock().unwrap().as_slice(),
            &["handle-1".to_string()]
        );
        assert_eq!(scheduler.handle_for(note.id), Some("handle-2"));
    }

    #[tokio::test]
    async fn test_cancel_for_removes_handle() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let backend = Arc::new(RecordingBackend::default());
        let mut scheduler =
            ReminderScheduler::load(blob, backend.clone(), ReminderPolicy::default()).unwrap();

        let clock = LocalClock::utc();
        let note = due_note(6);

        scheduler.schedule_for(&note, &clock).await.unwrap();
        scheduler.cancel_for(note.id).await.unwrap();

        assert_eq!(scheduler.outstanding(), 0);
        assert_eq!(backend.cancelled.lock().unwrap().len(), 1);

        // Cancelling again is a no-op
        scheduler.cancel_for(note.id).await.unwrap();
        assert_eq!(backend.cancelled.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_handle_map_survives_reload() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let backend: Arc<dyn ReminderBackend> = Arc::new(RecordingBackend::default());
        let clock = LocalClock::utc();
        let note = due_note(6);

        {
            let mut scheduler = ReminderScheduler::load(
                blob.clone(),
                backend.clone(),
                ReminderPolicy::default(),
            )
            .unwrap();
            scheduler.schedule_for(&note, &clock).await.unwrap();
        }

        let scheduler =
            ReminderScheduler::load(blob, backend, ReminderPolicy::default()).unwrap();
        assert_eq!(scheduler.outstanding(), 1);
        assert!(scheduler.handle_for(note.id).is_some());
    }

    #[tokio::test]
    async fn test_no_reminder_for_idea_note() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let backend = Arc::new(RecordingBackend::default());
        let mut scheduler =
            ReminderScheduler::load(blob, backend.clone(), ReminderPolicy::default()).unwrap();

        let note = Note::from_draft(NoteDraft {
            raw_text: "an app that waters plants".to_string(),
            title: "Plant-watering app".to_string(),
            category: Category::Idea,
            due_date: None,
            entities: Vec::new(),
            tags: Vec::new(),
        });

        let trigger = scheduler
            .schedule_for(&note, &LocalClock::utc())
            .await
            .unwrap();
        assert!(trigger.is_none());
        assert_eq!(scheduler.outstanding(), 0);
        assert!(backend.scheduled.lock().unwrap().is_empty());
    }
}
