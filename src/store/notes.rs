//! The note collection: CRUD plus read-side derived views.
//!
//! Canonical order is `created_at` descending (newest first); every
//! alternate ordering is a derived view, never a mutation of stored
//! order.

use std::sync::Arc;

use uuid::Uuid;

use super::blob::{BlobStore, KEY_NOTES};
use super::StoreError;
use crate::domain::{Category, Note, NoteDraft, NotePatch};

/// In-memory note collection flushed to the blob store on every mutation.
pub struct NoteStore {
    blob: Arc<dyn BlobStore>,
    notes: Vec<Note>,
}

impl NoteStore {
    /// Load the collection from the blob store. A missing blob means an
    /// empty collection, not an error.
    pub fn load(blob: Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        let notes = match blob.get(KEY_NOTES)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(Self { blob, notes })
    }

    /// Persist `next`, then commit it as the live collection.
    ///
    /// On failure the previous collection stays in place, so callers
    /// never observe a partial write.
    fn persist_and_commit(&mut self, next: Vec<Note>) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next)?;
        self.blob.put(KEY_NOTES, &json)?;
        self.notes = next;
        Ok(())
    }

    /// Materialize a draft, prepend it (most-recent-first), persist,
    /// and return the stored note.
    pub fn add(&mut self, draft: NoteDraft) -> Result<Note, StoreError> {
        let note = Note::from_draft(draft);
        let mut next = Vec::with_capacity(self.notes.len() + 1);
        next.push(note.clone());
        next.extend(self.notes.iter().cloned());
        self.persist_and_commit(next)?;
        Ok(note)
    }

    /// Map-style transform of one note. Unknown ids are a silent no-op
    /// (`Ok(None)`).
    fn map_note<F>(&mut self, id: Uuid, transform: F) -> Result<Option<Note>, StoreError>
    where
        F: Fn(&mut Note),
    {
        if !self.notes.iter().any(|n| n.id == id) {
            return Ok(None);
        }

        let mut updated = None;
        let next: Vec<Note> = self
            .notes
            .iter()
            .cloned()
            .map(|mut note| {
                if note.id == id {
                    transform(&mut note);
                    updated = Some(note.clone());
                }
                note
            })
            .collect();

        self.persist_and_commit(next)?;
        Ok(updated)
    }

    /// Flip the completion flag.
    pub fn toggle_complete(&mut self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.map_note(id, |note| note.completed = !note.completed)
    }

    /// Set the completion flag (bulk-action form).
    pub fn set_completed(&mut self, id: Uuid, completed: bool) -> Result<Option<Note>, StoreError> {
        self.map_note(id, move |note| note.completed = completed)
    }

    /// Hide the note from primary views. Archival is independent of
    /// completion.
    pub fn archive(&mut self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.map_note(id, |note| {
            if note.archived_at.is_none() {
                note.archived_at = Some(chrono::Utc::now());
            }
        })
    }

    /// Bring the note back into primary views.
    pub fn unarchive(&mut self, id: Uuid) -> Result<Option<Note>, StoreError> {
        self.map_note(id, |note| note.archived_at = None)
    }

    /// Merge only the supplied fields.
    pub fn update(&mut self, id: Uuid, patch: NotePatch) -> Result<Option<Note>, StoreError> {
        self.map_note(id, move |note| patch.apply(note))
    }

    /// Permanently remove the note; no tombstone. Returns whether
    /// anything was removed.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        if !self.notes.iter().any(|n| n.id == id) {
            return Ok(false);
        }
        let next: Vec<Note> = self.notes.iter().filter(|n| n.id != id).cloned().collect();
        self.persist_and_commit(next)?;
        Ok(true)
    }

    /// Remove `tag` from every note carrying it; the caller-level
    /// first half of section-deletion cascade. Returns how many notes
    /// were swept.
    pub fn strip_tag(&mut self, tag: &str) -> Result<usize, StoreError> {
        let affected = self
            .notes
            .iter()
            .filter(|n| n.tags.iter().any(|t| t == tag))
            .count();
        if affected == 0 {
            return Ok(0);
        }

        let next: Vec<Note> = self
            .notes
            .iter()
            .cloned()
            .map(|mut note| {
                note.tags.retain(|t| t != tag);
                note
            })
            .collect();

        self.persist_and_commit(next)?;
        Ok(affected)
    }

    // ------------------------------------------------------------------
    // Read-side views (never mutate stored order)
    // ------------------------------------------------------------------

    /// The full collection, newest first.
    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    /// Look up one note by id.
    pub fn get(&self, id: Uuid) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Notes visible in primary views.
    pub fn active(&self) -> Vec<&Note> {
        self.notes.iter().filter(|n| n.is_active()).collect()
    }

    /// Archived notes (still queryable/searchable).
    pub fn archived(&self) -> Vec<&Note> {
        self.notes.iter().filter(|n| !n.is_active()).collect()
    }

    /// Active notes in one category.
    pub fn by_category(&self, category: Category) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.is_active() && n.category == category)
            .collect()
    }

    /// Active notes tagged with a section name.
    pub fn by_tag(&self, tag: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|n| n.is_active() && n.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Active notes with a due date, chronological by due date.
    pub fn timeline(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| n.is_active() && n.due_date.is_some())
            .collect();
        notes.sort_by_key(|n| n.due_date);
        notes
    }

    /// Case-insensitive substring search over title, raw text,
    /// entities, and tags. Archived notes are included.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        let query_lower = query.to_lowercase();
        self.notes
            .iter()
            .filter(|note| {
                note.title.to_lowercase().contains(&query_lower)
                    || note.raw_text.to_lowercase().contains(&query_lower)
                    || note.entities.iter().any(|e| e.to_lowercase().contains(&query_lower))
                    || note.tags.iter().any(|t| t.to_lowercase().contains(&query_lower))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
