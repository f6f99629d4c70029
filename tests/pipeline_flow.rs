//! Pipeline Integration Tests
//!
//! Full capture and query flows against scripted service doubles.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use voxnote::capture::AudioClip;
use voxnote::domain::{CommandAction, CustomSection, LocalClock, Note};
use voxnote::reminder::{ReminderBackend, ReminderPolicy, ReminderScheduler};
use voxnote::speech::Transcriber;
use voxnote::store::{BlobStore, MemoryBlobStore, NoteStore, SectionStore};
use voxnote::understand::LanguageService;
use voxnote::{Category, VoicePipeline};

struct FixedTranscriber(String);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(
        &self,
        _clip: &AudioClip,
        _sections: &[CustomSection],
        _timezone: &str,
    ) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct ScriptedLanguage {
    replies: Mutex<Vec<String>>,
}

impl ScriptedLanguage {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
        })
    }

    fn push(&self, reply: String) {
        self.replies.lock().unwrap().push(reply);
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

#[derive(Default)]
struct NullBackend;

#[async_trait]
impl ReminderBackend for NullBackend {
    async fn schedule(&self, note: &Note, _trigger: NaiveDateTime) -> Result<String> {
        Ok(format!("handle-{}", note.id))
    }
    async fn cancel(&self, _handle: &str) -> Result<()> {
        Ok(())
    }
}

fn build_pipeline(transcript: &str, language: Arc<ScriptedLanguage>) -> VoicePipeline {
    let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    VoicePipeline::new(
        Arc::new(FixedTranscriber(transcript.to_string())),
        language,
        NoteStore::load(blob.clone()).unwrap(),
        SectionStore::load(blob.clone()).unwrap(),
        ReminderScheduler::load(blob, Arc::new(NullBackend), ReminderPolicy::default()).unwrap(),
        LocalClock::utc(),
    )
}

fn clip() -> AudioClip {
    AudioClip::from_bytes(b"pretend this is audio".to_vec(), "audio/mp4", "m4a").unwrap()
}

#[tokio::test]
async fn test_mixed_memo_becomes_two_notes() {
    let reply = r#"{"notes": [
        {"rawText": "buy milk, eggs, and bread", "title": "Buy milk, eggs, and bread", "category": "shopping", "entities": ["milk", "eggs", "bread"], "tags": []},
        {"rawText": "call mom", "title": "Call mom", "category": "tomorrow", "entities": ["mom"], "tags": []}
    ]}"#;
    let mut pipeline = build_pipeline(
        "Buy milk, eggs, and bread; also call mom tomorrow",
        ScriptedLanguage::new(&[reply]),
    );

    let stored = pipeline.capture_notes(&clip()).await.unwrap();

    assert_eq!(stored.len(), 2);
    let shopping = stored.iter().find(|n| n.category == Category::Shopping).unwrap();
    assert!(shopping.raw_text.contains("milk, eggs, and bread"));
    let tomorrow = stored.iter().find(|n| n.category == Category::Tomorrow).unwrap();
    assert!(tomorrow.raw_text.contains("call mom"));
}

#[tokio::test]
async fn test_grocery_complete_scenario() {
    // Seed the store with one shopping note
    let capture_reply = r#"{"notes": [
        {"rawText": "grocery list, milk and eggs", "title": "Grocery list", "category": "shopping"}
    ]}"#;
    let language = ScriptedLanguage::new(&[capture_reply]);
    let mut pipeline = build_pipeline("grocery list, milk and eggs", language.clone());

    let stored = pipeline.capture_notes(&clip()).await.unwrap();
    let grocery_id = stored[0].id;

    // "mark my grocery list as done"
    language.push(format!(
        r#"{{"response": "Done! Your grocery list is marked complete.", "matchedNoteIds": ["{}"], "action": "complete"}}"#,
        grocery_id
    ));
    let result = pipeline
        .query_text("mark my grocery list as done")
        .await
        .unwrap();

    assert_eq!(result.action, Some(CommandAction::Complete));
    assert_eq!(result.matched_notes.len(), 1);
    assert_eq!(result.matched_notes[0].id, grocery_id);
    assert!(pipeline.notes().get(grocery_id).unwrap().completed);
}

#[tokio::test]
async fn test_matched_notes_are_exactly_the_known_subset() {
    let capture_reply = r#"{"notes": [
        {"rawText": "first", "title": "First", "category": "other"},
        {"rawText": "second", "title": "Second", "category": "other"}
    ]}"#;
    let language = ScriptedLanguage::new(&[capture_reply]);
    let mut pipeline = build_pipeline("first. second.", language.clone());

    let stored = pipeline.capture_notes(&clip()).await.unwrap();
    let known = stored[0].id;

    // Service returns a duplicate, an unknown id, and garbage
    language.push(format!(
        r#"{{"response": "ok", "matchedNoteIds": ["{known}", "{known}", "11111111-2222-3333-4444-555555555555", "garbage"]}}"#,
    ));
    let result = pipeline.query_text("show me the first one").await.unwrap();

    let ids: Vec<_> = result.matched_notes.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![known]);
}

#[tokio::test]
async fn test_garbage_understanding_degrades_not_raises() {
    // Capture: non-JSON output falls back to a single `other` draft
    let language = ScriptedLanguage::new(&["total nonsense, no JSON at all"]);
    let mut pipeline = build_pipeline("remember to renew my passport", language.clone());

    let stored = pipeline.capture_notes(&clip()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].category, Category::Other);
    assert_eq!(stored[0].raw_text, "remember to renew my passport");
    assert!(stored[0].tags.is_empty());

    // Query: same treatment, fallback response and no action
    language.push("also not JSON".to_string());
    let result = pipeline.query_text("what's due this week").await.unwrap();
    assert_eq!(result.response, "I couldn't find anything related to that.");
    assert!(result.matched_notes.is_empty());
    assert!(result.action.is_none());
}

#[tokio::test]
async fn test_create_section_by_voice_then_autotag() {
    let language = ScriptedLanguage::new(&[
        r#"{"response": "Created your Workout section.", "action": "create_section", "sectionName": "Workout", "sectionIcon": "dumbbell", "sectionKeywords": ["gym", "run"]}"#,
    ]);
    let mut pipeline = build_pipeline("make a section for workouts", language.clone());

    let result = pipeline.run_command(&clip()).await.unwrap();
    assert_eq!(result.action, Some(CommandAction::CreateSection));

    let section = pipeline.sections().find_by_name("Workout").unwrap();
    assert_eq!(section.icon, "dumbbell");
    assert_eq!(section.keywords, vec!["gym".to_string(), "run".to_string()]);

    // Subsequent captures may tag against the new section
    language.push(
        r#"{"notes": [{"rawText": "leg day at the gym", "title": "Leg day", "category": "today", "tags": ["Workout"]}]}"#
            .to_string(),
    );
    let stored = pipeline.capture_text("leg day at the gym").await.unwrap();
    assert_eq!(stored[0].tags, vec!["Workout".to_string()]);
}

#[tokio::test]
async fn test_archive_action_hides_notes_from_primary_views() {
    let capture_reply = r#"{"notes": [
        {"rawText": "old project thoughts", "title": "Old project thoughts", "category": "idea"}
    ]}"#;
    let language = ScriptedLanguage::new(&[capture_reply]);
    let mut pipeline = build_pipeline("old project thoughts", language.clone());

    let stored = pipeline.capture_notes(&clip()).await.unwrap();
    let id = stored[0].id;

    language.push(format!(
        r#"{{"response": "Archived it.", "matchedNoteIds": ["{}"], "action": "archive"}}"#,
        id
    ));
    pipeline.query_text("put that old idea away").await.unwrap();

    let note = pipeline.notes().get(id).unwrap();
    assert!(note.archived_at.is_some());
    assert!(!note.completed);
    assert!(pipeline.notes().active().is_empty());
    assert_eq!(pipeline.notes().archived().len(), 1);
}
