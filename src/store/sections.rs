//! The custom-section collection.
//!
//! Deleting a section does NOT cascade into note tags at this level;
//! the documented caller sequence is `NoteStore::strip_tag(name)`
//! first, then `SectionStore::delete(id)`, so a failed second step
//! never silently loses note data.

use std::sync::Arc;

use uuid::Uuid;

use super::blob::{BlobStore, KEY_SECTIONS};
use super::StoreError;
use crate::domain::{CustomSection, SectionPatch};

/// In-memory section collection flushed to the blob store on every
/// mutation.
pub struct SectionStore {
    blob: Arc<dyn BlobStore>,
    sections: Vec<CustomSection>,
}

impl SectionStore {
    /// Load the collection; a missing blob means no sections yet.
    pub fn load(blob: Arc<dyn BlobStore>) -> Result<Self, StoreError> {
        let sections = match blob.get(KEY_SECTIONS)? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        Ok(Self { blob, sections })
    }

    fn persist_and_commit(&mut self, next: Vec<CustomSection>) -> Result<(), StoreError> {
        let json = serde_json::to_string(&next)?;
        self.blob.put(KEY_SECTIONS, &json)?;
        self.sections = next;
        Ok(())
    }

    /// Create a section. If one with the same name already exists
    /// (case-insensitive) it is returned unchanged instead of creating
    /// a duplicate smart folder.
    pub fn add(
        &mut self,
        name: &str,
        icon: &str,
        keywords: Vec<String>,
    ) -> Result<CustomSection, StoreError> {
        if let Some(existing) = self.find_by_name(name) {
            return Ok(existing.clone());
        }

        let section = CustomSection::new(name, icon, keywords);
        let mut next = self.sections.clone();
        next.push(section.clone());
        self.persist_and_commit(next)?;
        Ok(section)
    }

    /// Merge only the supplied fields. Unknown ids are a silent no-op.
    pub fn update(
        &mut self,
        id: Uuid,
        patch: SectionPatch,
    ) -> Result<Option<CustomSection>, StoreError> {
        if !self.sections.iter().any(|s| s.id == id) {
            return Ok(None);
        }

        let mut updated = None;
        let next: Vec<CustomSection> = self
            .sections
            .iter()
            .cloned()
            .map(|mut section| {
                if section.id == id {
                    patch.apply(&mut section);
                    updated = Some(section.clone());
                }
                section
            })
            .collect();

        self.persist_and_commit(next)?;
        Ok(updated)
    }

    /// Remove the section record. Notes keep any now-orphaned tag
    /// strings; sweeping them is the caller's explicit first step.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StoreError> {
        if !self.sections.iter().any(|s| s.id == id) {
            return Ok(false);
        }
        let next: Vec<CustomSection> =
            self.sections.iter().filter(|s| s.id != id).cloned().collect();
        self.persist_and_commit(next)?;
        Ok(true)
    }

    /// All sections in creation order.
    pub fn all(&self) -> &[CustomSection] {
        &self.sections
    }

    pub fn get(&self, id: Uuid) -> Option<&CustomSection> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&CustomSection> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::blob::MemoryBlobStore;

    fn store() -> SectionStore {
        SectionStore::load(Arc::new(MemoryBlobStore::new())).unwrap()
    }

    #[test]
    fn test_add_and_find() {
        let mut store = store();
        let section = store
            .add("Work", "briefcase", vec!["meeting".to_string()])
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.find_by_name("work").unwrap().id, section.id);
    }

    #[test]
    fn test_same_name_returns_existing() {
        let mut store = store();
        let first = store.add("Work", "briefcase", vec![]).unwrap();
        let second = store.add("work", "laptop", vec![]).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].icon, "briefcase");
    }

    #[test]
    fn test_delete_does_not_touch_other_sections() {
        let mut store = store();
        let work = store.add("Work", "briefcase", vec![]).unwrap();
        store.add("Home", "house", vec![]).unwrap();

        assert!(store.delete(work.id).unwrap());
        assert_eq!(store.len(), 1);
        assert!(store.find_by_name("Home").is_some());

        // Unknown id is a silent no-op
        assert!(!store.delete(work.id).unwrap());
    }

    #[test]
    fn test_reload_round_trips() {
        let blob = Arc::new(MemoryBlobStore::new());
        let created = {
            let mut store = SectionStore::load(blob.clone()).unwrap();
            store
                .add("Groceries", "cart", vec!["buy".to_string(), "milk".to_string()])
                .unwrap()
        };

        let reloaded = SectionStore::load(blob).unwrap();
        let section = reloaded.get(created.id).unwrap();
        assert_eq!(section.name, "Groceries");
        assert_eq!(section.keywords.len(), 2);
    }
}
