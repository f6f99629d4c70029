//! User-defined smart folders.
//!
//! A section's `name` is the tag value matched against `Note.tags`;
//! its `keywords` are hints the extractor uses for auto-tagging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Icon used when a section is created without one.
pub const DEFAULT_SECTION_ICON: &str = "folder";

/// A user-defined smart folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomSection {
    /// Unique identifier
    pub id: Uuid,

    /// Display name; doubles as the tag value on notes
    pub name: String,

    /// Symbolic icon identifier (free text, `folder` fallback)
    pub icon: String,

    /// Free-text hints for extractor auto-tagging
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl CustomSection {
    /// Create a section, substituting the default icon for an empty one.
    pub fn new(
        name: impl Into<String>,
        icon: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        let icon = icon.into();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: if icon.trim().is_empty() {
                DEFAULT_SECTION_ICON.to_string()
            } else {
                icon
            },
            keywords,
            created_at: Utc::now(),
        }
    }
}

/// Partial update for a section; only supplied fields are merged.
#[derive(Debug, Clone, Default)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub keywords: Option<Vec<String>>,
}

impl SectionPatch {
    /// Merge this patch into a section, leaving unset fields untouched.
    pub fn apply(&self, section: &mut CustomSection) {
        if let Some(ref name) = self.name {
            section.name = name.clone();
        }
        if let Some(ref icon) = self.icon {
            section.icon = icon.clone();
        }
        if let Some(ref keywords) = self.keywords {
            section.keywords = keywords.clone();
        }
    }
}
