//! Memoised extractions keyed by [`FileId`].

use crate::config::CachePolicy;
use crate::pipeline::extract::Extraction;
use crate::session::FileId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Extraction results for uploaded files.
///
/// Entries are shared as `Arc<Extraction>` so callers can keep using one
/// after releasing the session lock.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    policy: CachePolicy,
    entries: HashMap<FileId, Arc<Extraction>>,
}

impl ExtractionCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: HashMap::new(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn get(&self, file_id: &FileId) -> Option<Arc<Extraction>> {
        self.entries.get(file_id).cloned()
    }

    pub fn contains(&self, file_id: &FileId) -> bool {
        self.entries.contains_key(file_id)
    }

    /// Store the extraction of `file_id`, which becomes the current file.
    ///
    /// Under [`CachePolicy::EvictOnNewFile`] every other entry is dropped.
    pub fn insert(&mut self, file_id: FileId, extraction: Extraction) -> Arc<Extraction> {
        self.switch_to(&file_id);
        let entry = Arc::new(extraction);
        self.entries.insert(file_id, Arc::clone(&entry));
        entry
    }

    /// Apply the eviction policy for a switch to `file_id` without storing anything.
    pub fn switch_to(&mut self, file_id: &FileId) {
        if self.policy == CachePolicy::EvictOnNewFile {
            let before = self.entries.len();
            self.entries.retain(|id, _| id == file_id);
            let evicted = before - self.entries.len();
            if evicted > 0 {
                debug!("Evicted {evicted} cached extraction(s)");
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(text: &str) -> Extraction {
        Extraction {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn evict_on_new_file_keeps_only_the_latest() {
        let mut cache = ExtractionCache::new(CachePolicy::EvictOnNewFile);
        let a = FileId::new();
        let b = FileId::new();
        cache.insert(a, extraction("A"));
        cache.insert(b, extraction("B"));
        assert!(!cache.contains(&a));
        assert_eq!(cache.get(&b).unwrap().text, "B");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unbounded_retains_old_entries() {
        let mut cache = ExtractionCache::new(CachePolicy::Unbounded);
        let a = FileId::new();
        let b = FileId::new();
        cache.insert(a, extraction("A"));
        cache.insert(b, extraction("B"));
        assert_eq!(cache.get(&a).unwrap().text, "A");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn switch_without_insert_still_evicts() {
        let mut cache = ExtractionCache::new(CachePolicy::EvictOnNewFile);
        cache.insert(FileId::new(), extraction("A"));
        cache.switch_to(&FileId::new());
        assert!(cache.is_empty());
    }
}
