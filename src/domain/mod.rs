//! Data structures for the note engine.
//!
//! - `note`: Note, NoteDraft, Category
//! - `section`: CustomSection (user-defined smart folder)
//! - `command`: CommandResult and bulk actions
//! - `clock`: caller-supplied local time context

pub mod clock;
pub mod command;
pub mod note;
pub mod section;

pub use clock::LocalClock;
pub use command::{CommandAction, CommandResult};
pub use note::{Category, Note, NoteDraft, NotePatch};
pub use section::{CustomSection, SectionPatch, DEFAULT_SECTION_ICON};
