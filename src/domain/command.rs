//! Interpreter output for one query utterance.
//!
//! A `CommandResult` is transient: it describes an answer, the matched
//! notes, and an optional bulk action. Applying the action is the
//! pipeline's job, never the interpreter's.

use serde::{Deserialize, Serialize};

use super::note::Note;

/// Bulk actions the interpreter can classify.
///
/// Mutually exclusive; at most one per utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandAction {
    /// Mark the matched notes completed
    Complete,

    /// Permanently remove the matched notes
    Delete,

    /// Hide the matched notes from primary views
    Archive,

    /// Create a new custom section
    CreateSection,
}

impl CommandAction {
    /// Parse an action from untrusted service output.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "complete" | "done" => Some(Self::Complete),
            "delete" | "remove" => Some(Self::Delete),
            "archive" => Some(Self::Archive),
            "create_section" | "createsection" => Some(Self::CreateSection),
            _ => None,
        }
    }
}

/// Required reply when nothing matches or the service output is unusable.
pub const FALLBACK_RESPONSE: &str = "I couldn't find anything related to that.";

/// Result of interpreting one query utterance. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// The transcript text that was interpreted
    pub query: String,

    /// Conversational natural-language reply (always present)
    pub response: String,

    /// Fully hydrated notes matched against the caller's collection;
    /// ids absent from that collection are silently dropped
    #[serde(default)]
    pub matched_notes: Vec<Note>,

    /// Bulk action, if one was classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<CommandAction>,

    /// Section name (create_section only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    /// Section icon (create_section only; `folder` fallback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_icon: Option<String>,

    /// Section keywords (create_section only; empty fallback)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_keywords: Option<Vec<String>>,
}

impl CommandResult {
    /// The degenerate result for a malformed or empty understanding
    /// response: fallback reply, no matches, no action.
    pub fn fallback(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            response: FALLBACK_RESPONSE.to_string(),
            matched_notes: Vec::new(),
            action: None,
            section_name: None,
            section_icon: None,
            section_keywords: None,
        }
    }
}
