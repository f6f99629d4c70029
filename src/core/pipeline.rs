//! The voice interaction pipeline.
//!
//! One sequential round-trip per interaction: clip → transcript →
//! {drafts | command} → store mutation. Upstream calls happen before
//! any mutation, so a failed or timed-out call leaves the store
//! untouched and no partial note is ever written.

use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::capture::AudioClip;
use crate::domain::{
    CommandAction, CommandResult, LocalClock, Note, DEFAULT_SECTION_ICON,
};
use crate::reminder::ReminderScheduler;
use crate::speech::Transcriber;
use crate::store::{NoteStore, SectionStore};
use crate::understand::{CommandInterpreter, LanguageService, NoteExtractor};

/// Everything one voice interaction needs, wired together.
///
/// Collections are injected at construction; no ambient singletons.
pub struct VoicePipeline {
    transcriber: Arc<dyn Transcriber>,
    extractor: NoteExtractor,
    interpreter: CommandInterpreter,
    notes: NoteStore,
    sections: SectionStore,
    scheduler: ReminderScheduler,
    clock: LocalClock,
}

impl VoicePipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        language: Arc<dyn LanguageService>,
        notes: NoteStore,
        sections: SectionStore,
        scheduler: ReminderScheduler,
        clock: LocalClock,
    ) -> Self {
        Self {
            transcriber,
            extractor: NoteExtractor::new(language.clone()),
            interpreter: CommandInterpreter::new(language),
            notes,
            sections,
            scheduler,
            clock,
        }
    }

    /// Capture flow: clip → transcript → drafts → stored notes.
    pub async fn capture_notes(&mut self, clip: &AudioClip) -> Result<Vec<Note>> {
        let transcript = self
            .transcriber
            .transcribe(clip, self.sections.all(), &self.clock.timezone)
            .await
            .context("Transcription failed")?;

        tracing::info!("Transcribed clip {}: {:?}", clip.id, transcript);
        self.capture_text(&transcript).await
    }

    /// Capture flow entered after transcription.
    pub async fn capture_text(&mut self, transcript: &str) -> Result<Vec<Note>> {
        let drafts = self
            .extractor
            .extract(transcript, self.sections.all(), &self.clock)
            .await?;

        let mut stored = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let note = self.notes.add(draft)?;
            // A reminder that fails to register must not lose the note
            if let Err(e) = self.scheduler.schedule_for(&note, &self.clock).await {
                tracing::warn!("Failed to schedule reminder for '{}': {}", note.title, e);
            }
            stored.push(note);
        }

        Ok(stored)
    }

    /// Query flow: clip → transcript → interpretation → applied action.
    pub async fn run_command(&mut self, clip: &AudioClip) -> Result<CommandResult> {
        let transcript = self
            .transcriber
            .transcribe(clip, self.sections.all(), &self.clock.timezone)
            .await
            .context("Transcription failed")?;

        tracing::info!("Transcribed query {}: {:?}", clip.id, transcript);
        self.query_text(&transcript).await
    }

    /// Query flow entered after transcription.
    pub async fn query_text(&mut self, transcript: &str) -> Result<CommandResult> {
        let result = self
            .interpreter
            .interpret(transcript, self.notes.all(), self.sections.all(), &self.clock)
            .await?;

        self.apply(&result).await?;
        Ok(result)
    }

    /// The action-to-effect mapping.
    async fn apply(&mut self, result: &CommandResult) -> Result<()> {
        let Some(action) = result.action else {
            return Ok(());
        };

        match action {
            CommandAction::Complete => {
                for note in &result.matched_notes {
                    self.notes.set_completed(note.id, true)?;
                    self.scheduler.cancel_for(note.id).await?;
                }
            }
            CommandAction::Delete => {
                for note in &result.matched_notes {
                    self.notes.delete(note.id)?;
                    self.scheduler.cancel_for(note.id).await?;
                }
            }
            CommandAction::Archive => {
                for note in &result.matched_notes {
                    self.notes.archive(note.id)?;
                    self.scheduler.cancel_for(note.id).await?;
                }
            }
            CommandAction::CreateSection => {
                if let Some(ref name) = result.section_name {
                    let icon = result.section_icon.as_deref().unwrap_or(DEFAULT_SECTION_ICON);
                    let keywords = result.section_keywords.clone().unwrap_or_default();
                    let section = self.sections.add(name, icon, keywords)?;
                    tracing::info!("Created section '{}'", section.name);
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Manual note operations (UI-initiated), reminder-aware
    // ------------------------------------------------------------------

    /// Toggle completion; a newly completed note loses its reminder.
    pub async fn toggle_complete(&mut self, id: Uuid) -> Result<Option<Note>> {
        let updated = self.notes.toggle_complete(id)?;
        if let Some(ref note) = updated {
            if note.completed {
                self.scheduler.cancel_for(id).await?;
            }
        }
        Ok(updated)
    }

    /// Archive and cancel any outstanding reminder.
    pub async fn archive_note(&mut self, id: Uuid) -> Result<Option<Note>> {
        let updated = self.notes.archive(id)?;
        if updated.is_some() {
            self.scheduler.cancel_for(id).await?;
        }
        Ok(updated)
    }

    /// Unarchive. Deliberately does not reschedule the reminder.
    pub async fn unarchive_note(&mut self, id: Uuid) -> Result<Option<Note>> {
        Ok(self.notes.unarchive(id)?)
    }

    /// Delete permanently and cancel any outstanding reminder.
    pub async fn delete_note(&mut self, id: Uuid) -> Result<bool> {
        let removed = self.notes.delete(id)?;
        if removed {
            self.scheduler.cancel_for(id).await?;
        }
        Ok(removed)
    }

    /// Create a section directly (the non-voice path).
    pub fn add_section(&mut self, name: &str, icon: &str, keywords: Vec<String>) -> Result<()> {
        self.sections.add(name, icon, keywords)?;
        Ok(())
    }

    /// Delete a section with the documented two-step cascade: sweep the
    /// tag from every note first, then drop the section record, so a
    /// failed second step never silently loses note data.
    pub async fn remove_section(&mut self, id: Uuid) -> Result<bool> {
        let Some(name) = self.sections.get(id).map(|s| s.name.clone()) else {
            return Ok(false);
        };

        let swept = self.notes.strip_tag(&name)?;
        if swept > 0 {
            tracing::info!("Removed tag '{}' from {} notes", name, swept);
        }
        Ok(self.sections.delete(id)?)
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn sections(&self) -> &SectionStore {
        &self.sections
    }

    pub fn clock(&self) -> &LocalClock {
        &self.clock
    }
}
