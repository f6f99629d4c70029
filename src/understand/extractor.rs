//! Transcript → structured note drafts.
//!
//! One draft per semantically distinct thought; members of a single
//! enumerable list (a shopping list) collapse into one draft. The
//! segmentation itself is the service's job; this module owns the
//! prompt and the boundary coercion, including the single-draft
//! fallback when the service output is not a well-formed multi-note
//! structure.

use std::sync::Arc;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

use super::{first_json_value, string_field, string_list_field, LanguageService};
use crate::domain::note::{truncate_title, TITLE_MAX_CHARS};
use crate::domain::{Category, CustomSection, LocalClock, NoteDraft};

/// The note-extraction step.
pub struct NoteExtractor {
    language: Arc<dyn LanguageService>,
}

impl NoteExtractor {
    pub fn new(language: Arc<dyn LanguageService>) -> Self {
        Self { language }
    }

    /// Segment a transcript into zero or more drafts.
    ///
    /// Pure transformation: persisting drafts is the caller's job.
    /// Service malformation never raises; only transport failure does.
    pub async fn extract(
        &self,
        transcript: &str,
        sections: &[CustomSection],
        clock: &LocalClock,
    ) -> Result<Vec<NoteDraft>> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(transcript, sections, clock);
        let output = self
            .language
            .complete(&prompt)
            .await
            .context("Note extraction call failed")?;

        tracing::debug!("Extractor output: {}", output);
        Ok(parse_drafts(&output, transcript, sections, clock))
    }
}

fn build_prompt(transcript: &str, sections: &[CustomSection], clock: &LocalClock) -> String {
    let section_lines = if sections.is_empty() {
        "(none)".to_string()
    } else {
        sections
            .iter()
            .map(|s| format!("- {} (keywords: {})", s.name, s.keywords.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You segment a voice transcript into structured notes.

Current local time: {now} ({tz}).

Rules:
- Produce one note per semantically distinct thought, task, reminder, or idea. Items that belong to one enumerable list (e.g. a shopping list) collapse into a SINGLE note.
- "rawText": the verbatim transcript portion for that note with filler words removed. Never paraphrase.
- "title": a summary of at most {title_max} characters. Never include a time of day in the title; time belongs only in "dueDate".
- "category": one of "today", "tomorrow", "idea", "shopping", "other". Tasks, reminders, and meetings are "today" or "tomorrow" depending on the day they refer to. Buying, getting, or picking things up is "shopping". Creative or conceptual thoughts are "idea". Everything else is "other".
- "dueDate": ISO 8601 UTC timestamp, only when the transcript names a specific time. Resolve relative phrases ("today", "tonight", "EOD") against the current local time above; "EOD" means 17:00 local. Omit the field when no specific time is mentioned.
- "entities": names of people, places, and things mentioned, in order.
- "tags": section names from the list below whose keywords or meaning match the note. Use ONLY names from that list; when nothing matches, use an empty array.

Custom sections (the only allowed tag values):
{sections}

Transcript:
{transcript}

Reply with only a JSON object: {{"notes": [{{"rawText": "...", "title": "...", "category": "...", "dueDate": "...", "entities": [], "tags": []}}]}}"#,
        now = clock.now_local().format("%Y-%m-%dT%H:%M:%S"),
        tz = clock.timezone,
        title_max = TITLE_MAX_CHARS,
        sections = section_lines,
        transcript = transcript,
    )
}

/// Coerce service output into drafts, falling back to one `other`
/// draft over the whole transcript when no well-formed multi-note
/// structure is present.
fn parse_drafts(
    output: &str,
    transcript: &str,
    sections: &[CustomSection],
    clock: &LocalClock,
) -> Vec<NoteDraft> {
    let items = match note_items(output) {
        Some(items) => items,
        None => {
            tracing::warn!("Extractor output was not a note structure; using fallback draft");
            return vec![NoteDraft::fallback(transcript)];
        }
    };

    let drafts: Vec<NoteDraft> = items
        .iter()
        .filter_map(|item| coerce_draft(item, sections, clock))
        .collect();

    // A well-formed empty array means "nothing actionable" and stays
    // empty; items that were all unusable mean malformed output.
    if drafts.is_empty() && !items.is_empty() {
        return vec![NoteDraft::fallback(transcript)];
    }
    drafts
}

/// The "notes" array, whether the payload is `{"notes": [...]}` or a
/// bare array.
fn note_items(output: &str) -> Option<Vec<Value>> {
    let value = first_json_value(output)?;
    match value {
        Value::Array(items) => Some(items),
        Value::Object(ref obj) => obj
            .get("notes")
            .and_then(Value::as_array)
            .map(|items| items.to_vec()),
        _ => None,
    }
}

fn coerce_draft(item: &Value, sections: &[CustomSection], clock: &LocalClock) -> Option<NoteDraft> {
    let obj = item.as_object()?;

    let raw_text = string_field(obj, &["rawText", "raw_text", "text"])?;
    let title_source =
        string_field(obj, &["title"]).unwrap_or_else(|| raw_text.clone());
    let title = truncate_title(&scrub_clock_time(&title_source), TITLE_MAX_CHARS);
    if title.is_empty() {
        return None;
    }

    let category = string_field(obj, &["category"])
        .map(|c| Category::parse_lenient(&c))
        .unwrap_or_default();

    let due_date = string_field(obj, &["dueDate", "due_date", "due"])
        .and_then(|raw| parse_due_date(&raw, clock));

    let entities = string_list_field(obj, &["entities"]);
    let tags = filter_tags(string_list_field(obj, &["tags"]), sections);

    Some(NoteDraft {
        raw_text,
        title,
        category,
        due_date,
        entities,
        tags,
    })
}

/// Keep only tags naming an existing section, normalized to the
/// section's own casing, deduplicated. Invented names are dropped.
fn filter_tags(tags: Vec<String>, sections: &[CustomSection]) -> Vec<String> {
    let mut filtered: Vec<String> = Vec::new();
    for tag in tags {
        let Some(section) = sections.iter().find(|s| s.name.eq_ignore_ascii_case(&tag)) else {
            continue;
        };
        if !filtered.iter().any(|t| t == &section.name) {
            filtered.push(section.name.clone());
        }
    }
    filtered
}

/// Accept RFC 3339 or a bare local timestamp; normalize to UTC.
fn parse_due_date(raw: &str, clock: &LocalClock) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(clock.to_utc(naive));
        }
    }
    None
}

/// Remove recognizable clock-time fragments ("3pm", "at 15:00") from a
/// title; time information belongs exclusively in the due date.
fn scrub_clock_time(title: &str) -> String {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    let re = CLOCK.get_or_init(|| {
        Regex::new(r"(?i)\b(?:at\s+)?(?:\d{1,2}(?::\d{2})?\s*(?:am|pm)|\d{1,2}:\d{2})\b")
            .expect("clock-time pattern is valid")
    });

    let scrubbed = re.replace_all(title, " ");
    scrubbed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ';', ':', '-'])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Service mock that pops scripted replies.
    struct ScriptedLanguage {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedLanguage {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl LanguageService for ScriptedLanguage {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no scripted reply left"))
        }
    }

    fn sections() -> Vec<CustomSection> {
        vec![
            CustomSection::new("Work", "briefcase", vec!["meeting".to_string()]),
            CustomSection::new("Errands", "cart", vec!["buy".to_string()]),
        ]
    }

    #[tokio::test]
    async fn test_two_distinct_items_yield_two_drafts() {
        let reply = r#"{"notes": [
            {"rawText": "buy milk, eggs, and bread", "title": "Buy milk, eggs, and bread", "category": "shopping", "entities": ["milk", "eggs", "bread"], "tags": []},
            {"rawText": "call mom", "title": "Call mom", "category": "tomorrow", "entities": ["mom"], "tags": []}
        ]}"#;
        let extractor = NoteExtractor::new(ScriptedLanguage::new(&[reply]));

        let drafts = extractor
            .extract(
                "Buy milk, eggs, and bread; also call mom tomorrow",
                &[],
                &LocalClock::utc(),
            )
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].category, Category::Shopping);
        assert!(drafts[0].raw_text.contains("milk, eggs, and bread"));
        assert_eq!(drafts[1].category, Category::Tomorrow);
        assert!(drafts[1].raw_text.contains("call mom"));
        for draft in &drafts {
            assert!(!draft.raw_text.is_empty());
            assert!(!draft.title.is_empty());
        }
    }

    #[tokio::test]
    async fn test_invented_tags_are_dropped() {
        let reply = r#"{"notes": [
            {"rawText": "prep the slides for standup", "title": "Prep standup slides", "category": "today", "tags": ["work", "Standup", "Errands"]}
        ]}"#;
        let extractor = NoteExtractor::new(ScriptedLanguage::new(&[reply]));

        let drafts = extractor
            .extract("prep the slides for standup", &sections(), &LocalClock::utc())
            .await
            .unwrap();

        // "work" normalizes to the section's casing, "Standup" is invented
        assert_eq!(drafts[0].tags, vec!["Work".to_string(), "Errands".to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back_to_single_draft() {
        let extractor =
            NoteExtractor::new(ScriptedLanguage::new(&["I'm sorry, I can't do that."]));

        let drafts = extractor
            .extract("remind me to water the plants", &[], &LocalClock::utc())
            .await
            .unwrap();

        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].category, Category::Other);
        assert!(drafts[0].tags.is_empty());
        assert!(drafts[0].due_date.is_none());
        assert_eq!(drafts[0].raw_text, "remind me to water the plants");
    }

    #[tokio::test]
    async fn test_well_formed_empty_array_means_no_drafts() {
        let extractor = NoteExtractor::new(ScriptedLanguage::new(&[r#"{"notes": []}"#]));

        let drafts = extractor
            .extract("uh, never mind", &[], &LocalClock::utc())
            .await
            .unwrap();
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_the_service() {
        let extractor = NoteExtractor::new(ScriptedLanguage::new(&[]));
        let drafts = extractor
            .extract("   ", &[], &LocalClock::utc())
            .await
            .unwrap();
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let extractor = NoteExtractor::new(ScriptedLanguage::new(&[]));
        let err = extractor
            .extract("buy milk", &[], &LocalClock::utc())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("extraction"));
    }

    #[test]
    fn test_scrub_clock_time() {
        assert_eq!(scrub_clock_time("Dentist at 3pm"), "Dentist");
        assert_eq!(scrub_clock_time("Dentist at 15:00"), "Dentist");
        assert_eq!(scrub_clock_time("Standup 9:30 AM with team"), "Standup with team");
        assert_eq!(scrub_clock_time("Buy 2 dozen eggs"), "Buy 2 dozen eggs");
    }

    #[test]
    fn test_due_date_normalizes_to_utc() {
        let clock = LocalClock::new("America/New_York", -300);

        let rfc = parse_due_date("2026-03-03T15:00:00-05:00", &clock).unwrap();
        assert_eq!(rfc.to_rfc3339(), "2026-03-03T20:00:00+00:00");

        // A bare timestamp is local wall-clock time
        let naive = parse_due_date("2026-03-03T15:00:00", &clock).unwrap();
        assert_eq!(naive, rfc);

        assert!(parse_due_date("sometime soon", &clock).is_none());
    }

    #[test]
    fn test_titles_never_carry_clock_times() {
        let clock = LocalClock::utc();
        let reply = r#"{"notes": [
            {"rawText": "dentist tomorrow at 3pm", "title": "Dentist at 3pm", "category": "tomorrow", "dueDate": "2026-03-04T15:00:00"}
        ]}"#;

        let drafts = parse_drafts(reply, "dentist tomorrow at 3pm", &[], &clock);
        assert_eq!(drafts[0].title, "Dentist");
        assert!(drafts[0].due_date.is_some());
    }
}
