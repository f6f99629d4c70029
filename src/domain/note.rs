//! Note records and extractor drafts.
//!
//! A `NoteDraft` is the extractor's output before the store assigns a
//! persistent id; a `Note` is the stored record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a captured thought.
///
/// Exactly one per note; drives default section placement and the
/// default reminder schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Task or reminder for today
    Today,

    /// Task or reminder for tomorrow
    Tomorrow,

    /// Creative or conceptual thought
    Idea,

    /// Something to buy or pick up
    Shopping,

    /// Anything else
    Other,
}

impl Default for Category {
    fn default() -> Self {
        Self::Other
    }
}

impl Category {
    /// Parse a category from untrusted service output.
    ///
    /// Unknown values fall back to `Other` rather than failing.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "today" => Self::Today,
            "tomorrow" => Self::Tomorrow,
            "idea" => Self::Idea,
            "shopping" => Self::Shopping,
            _ => Self::Other,
        }
    }

    /// Wire/display name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Idea => "idea",
            Self::Shopping => "shopping",
            Self::Other => "other",
        }
    }
}

/// A single captured thought or task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, assigned at creation, immutable
    pub id: Uuid,

    /// Cleaned transcript segment this note was derived from
    pub raw_text: String,

    /// Short summary (≤50 chars by convention), no due-date text embedded
    pub title: String,

    /// Category (exactly one)
    pub category: Category,

    /// Optional absolute due time, UTC-normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    /// Free-text names extracted from the utterance (people, places, things)
    #[serde(default)]
    pub entities: Vec<String>,

    /// Custom-section names this note belongs to; may go orphaned if a
    /// section is later deleted
    #[serde(default)]
    pub tags: Vec<String>,

    /// Completion flag, independent of archival
    #[serde(default)]
    pub completed: bool,

    /// Present when the note is hidden from primary views
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,

    /// Creation time, set once, immutable
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Materialize a draft into a stored note with a fresh id.
    pub fn from_draft(draft: NoteDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_text: draft.raw_text,
            title: draft.title,
            category: draft.category,
            due_date: draft.due_date,
            entities: draft.entities,
            tags: draft.tags,
            completed: false,
            archived_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the note shows up in primary (non-archived) views
    pub fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }
}

/// Extractor output prior to id assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    /// Verbatim (lightly cleaned) transcript portion for this draft
    pub raw_text: String,

    /// Short summary, never embeds a time-of-day fragment
    pub title: String,

    /// Category per the extraction policy
    pub category: Category,

    /// Optional absolute due time, UTC-normalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    /// Free-text entity names, in utterance order
    #[serde(default)]
    pub entities: Vec<String>,

    /// Section names, drawn only from the caller's existing sections
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NoteDraft {
    /// Build the degenerate single-draft fallback for a transcript.
    ///
    /// Used when extraction fails to produce a well-formed multi-note
    /// structure: the whole transcript becomes one `other` draft.
    pub fn fallback(transcript: &str) -> Self {
        let cleaned = transcript.trim();
        Self {
            raw_text: cleaned.to_string(),
            title: truncate_title(cleaned, TITLE_MAX_CHARS),
            category: Category::Other,
            due_date: None,
            entities: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// Partial update for a note; only supplied fields are merged.
///
/// `due_date` is two-level so a patch can clear it (`Some(None)`) as
/// well as set it (`Some(Some(t))`).
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub raw_text: Option<String>,
    pub title: Option<String>,
    pub category: Option<Category>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub entities: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub completed: Option<bool>,
}

impl NotePatch {
    /// Merge this patch into a note, leaving unset fields untouched.
    pub fn apply(&self, note: &mut Note) {
        if let Some(ref raw_text) = self.raw_text {
            note.raw_text = raw_text.clone();
        }
        if let Some(ref title) = self.title {
            note.title = title.clone();
        }
        if let Some(category) = self.category {
            note.category = category;
        }
        if let Some(due_date) = self.due_date {
            note.due_date = due_date;
        }
        if let Some(ref entities) = self.entities {
            note.entities = entities.clone();
        }
        if let Some(ref tags) = self.tags {
            note.tags = tags.clone();
        }
        if let Some(completed) = self.completed {
            note.completed = completed;
        }
    }
}

/// Conventional title length cap
pub const TITLE_MAX_CHARS: usize = 50;

/// Truncate a title to `max` characters on a char boundary.
pub fn truncate_title(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    trimmed
        .chars()
        .take(max)
        .collect::<String>()
        .trim_end()
        .to_string()
}
