//! Transcript + note collection → conversational answer and optional
//! bulk action.
//!
//! The interpreter classifies intent and resolves target notes; it
//! never mutates anything. Matched ids are intersection-filtered
//! against the caller's collection, so an id the service invented can
//! never surface.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use uuid::Uuid;

use super::{first_json_value, string_field, string_list_field, LanguageService};
use crate::domain::command::FALLBACK_RESPONSE;
use crate::domain::{
    CommandAction, CommandResult, CustomSection, LocalClock, Note, DEFAULT_SECTION_ICON,
};

/// The query-interpretation step.
pub struct CommandInterpreter {
    language: Arc<dyn LanguageService>,
}

impl CommandInterpreter {
    pub fn new(language: Arc<dyn LanguageService>) -> Self {
        Self { language }
    }

    /// Interpret one query utterance against the current collections.
    ///
    /// Always yields a `response`; a malformed or empty understanding
    /// response degrades to the fallback result rather than raising.
    pub async fn interpret(
        &self,
        transcript: &str,
        notes: &[Note],
        sections: &[CustomSection],
        clock: &LocalClock,
    ) -> Result<CommandResult> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Ok(CommandResult::fallback(transcript));
        }

        let prompt = build_prompt(transcript, notes, sections, clock);
        let output = self
            .language
            .complete(&prompt)
            .await
            .context("Query interpretation call failed")?;

        tracing::debug!("Interpreter output: {}", output);
        Ok(parse_result(&output, transcript, notes))
    }
}

fn build_prompt(
    transcript: &str,
    notes: &[Note],
    sections: &[CustomSection],
    clock: &LocalClock,
) -> String {
    let inventory = if notes.is_empty() {
        "(no notes)".to_string()
    } else {
        notes.iter().map(|n| inventory_line(n, clock)).collect::<Vec<_>>().join("\n")
    };

    let section_names = if sections.is_empty() {
        "(none)".to_string()
    } else {
        sections.iter().map(|s| s.name.clone()).collect::<Vec<_>>().join(", ")
    };

    format!(
        r#"You answer questions about a user's notes and classify bulk commands.

Current local time: {now} ({tz}).

Notes (id | title | category | state | due | tags):
{inventory}

Existing sections: {section_names}

User said:
{transcript}

Rules:
- "response": a short conversational answer. When you mention a note's due date, copy the "due" rendering from the inventory verbatim; never recompute times.
- "matchedNoteIds": ids from the inventory the user is referring to. Only ids that appear above; empty when nothing matches.
- "action": exactly one of "complete", "delete", "archive", "create_section", or omit it for a plain question. "complete" when the user marks things done, "delete" when they want things gone, "archive" when they want things put away, "create_section" when they ask for a new section, folder, or list.
- For "create_section" also return "sectionName", and when you can infer them, "sectionIcon" (a single symbolic icon word) and "sectionKeywords".
- If nothing matches, "response" must be: "{fallback}"

Reply with only a JSON object: {{"response": "...", "matchedNoteIds": [], "action": "...", "sectionName": "...", "sectionIcon": "...", "sectionKeywords": []}}"#,
        now = clock.now_local().format("%Y-%m-%dT%H:%M:%S"),
        tz = clock.timezone,
        inventory = inventory,
        section_names = section_names,
        transcript = transcript,
        fallback = FALLBACK_RESPONSE,
    )
}

fn inventory_line(note: &Note, clock: &LocalClock) -> String {
    let state = match (note.completed, note.is_active()) {
        (true, true) => "completed",
        (true, false) => "completed+archived",
        (false, true) => "open",
        (false, false) => "archived",
    };
    let due = note
        .due_date
        .map(|d| clock.render_local(d))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "- {} | {} | {} | {} | {} | {}",
        note.id,
        note.title,
        note.category.as_str(),
        state,
        due,
        if note.tags.is_empty() { "-".to_string() } else { note.tags.join(",") },
    )
}

/// Coerce service output into a `CommandResult`, degrading to the
/// fallback shape instead of raising.
fn parse_result(output: &str, transcript: &str, notes: &[Note]) -> CommandResult {
    let Some(Value::Object(obj)) = first_json_value(output) else {
        tracing::warn!("Interpreter output was not an object; using fallback result");
        return CommandResult::fallback(transcript);
    };

    let response =
        string_field(&obj, &["response", "answer"]).unwrap_or_else(|| FALLBACK_RESPONSE.to_string());

    let matched_notes = hydrate_matches(
        string_list_field(&obj, &["matchedNoteIds", "matched_note_ids", "noteIds"]),
        notes,
    );

    let mut action = string_field(&obj, &["action"]).and_then(|a| CommandAction::parse_lenient(&a));

    let mut section_name = None;
    let mut section_icon = None;
    let mut section_keywords = None;

    if action == Some(CommandAction::CreateSection) {
        match string_field(&obj, &["sectionName", "section_name"]) {
            Some(name) => {
                section_name = Some(name);
                section_icon = Some(
                    string_field(&obj, &["sectionIcon", "section_icon"])
                        .unwrap_or_else(|| DEFAULT_SECTION_ICON.to_string()),
                );
                section_keywords = Some(string_list_field(
                    &obj,
                    &["sectionKeywords", "section_keywords"],
                ));
            }
            // A create_section without a name is unusable
            None => action = None,
        }
    }

    CommandResult {
        query: transcript.to_string(),
        response,
        matched_notes,
        action,
        section_name,
        section_icon,
        section_keywords,
    }
}

/// Resolve returned ids against the caller's collection: id-list
/// order, duplicates and unknown ids silently dropped.
fn hydrate_matches(ids: Vec<String>, notes: &[Note]) -> Vec<Note> {
    let mut matched: Vec<Note> = Vec::new();
    for raw in ids {
        let Ok(id) = Uuid::parse_str(raw.trim()) else {
            continue;
        };
        if matched.iter().any(|n| n.id == id) {
            continue;
        }
        if let Some(note) = notes.iter().find(|n| n.id == id) {
            matched.push(note.clone());
        }
    }
    matched
}
