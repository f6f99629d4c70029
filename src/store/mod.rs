//! Local persistence: in-memory collections over an opaque blob store.
//!
//! Collections are the live source of truth and flush to the blob
//! store on every mutation. A failed flush surfaces a `StoreError` and
//! leaves the in-memory collection at the pre-mutation state, so
//! callers only ever observe the pre- or post-mutation collection.

pub mod blob;
pub mod notes;
pub mod sections;
pub mod settings;

use thiserror::Error;

pub use blob::{BlobStore, MemoryBlobStore, SqliteBlobStore};
pub use notes::NoteStore;
pub use sections::SectionStore;
pub use settings::{Settings, ThemeMode};

/// Errors surfaced by the persistence layer.
///
/// Normal CRUD on a well-formed id never errors; operating on a
/// nonexistent id is a silent no-op.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
