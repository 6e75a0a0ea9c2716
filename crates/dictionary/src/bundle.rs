//! The loaded record set together with its facet index.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::Result;
use crate::index::{FacetIndex, IdSet, RawIndex};
use crate::record::{DictEntry, RecordId};

pub const ENTRIES_FILE_NAME: &str = "dict.json";
pub const INDEX_FILE_NAME: &str = "index.json";

/// Immutable record universe plus its index. Built once, shared by `Arc`.
#[derive(Debug, Default)]
pub struct Dictionary {
    entries: BTreeMap<RecordId, Arc<DictEntry>>,
    universe: IdSet,
    index: FacetIndex,
}

impl Dictionary {
    /// Assembles a dictionary from parsed records and a raw index.
    pub fn from_parts(entries: Vec<DictEntry>, raw_index: RawIndex) -> Self {
        let mut by_id = BTreeMap::new();
        for entry in entries {
            let id = entry.id;
            if by_id.insert(id, Arc::new(entry)).is_some() {
                log::warn!("duplicate dictionary record id {id}; keeping the last one");
            }
        }
        let universe: IdSet = by_id.keys().copied().collect();
        let index = FacetIndex::from_raw(raw_index, &universe);
        Self {
            entries: by_id,
            universe,
            index,
        }
    }

    /// Assembles a dictionary whose index is derived from the records.
    pub fn from_entries(entries: Vec<DictEntry>) -> Self {
        let index = FacetIndex::from_entries(&entries);
        let entries: BTreeMap<RecordId, Arc<DictEntry>> = entries
            .into_iter()
            .map(|entry| (entry.id, Arc::new(entry)))
            .collect();
        let universe = entries.keys().copied().collect();
        Self {
            entries,
            universe,
            index,
        }
    }

    /// Parses the two bundle documents.
    pub fn from_json(entries_json: &[u8], index_json: &[u8]) -> Result<Self> {
        let entries: Vec<DictEntry> = serde_json::from_slice(entries_json)?;
        let raw_index: RawIndex = serde_json::from_slice(index_json)?;
        Ok(Self::from_parts(entries, raw_index))
    }

    /// Parses a record document alone and derives the index from it.
    pub fn from_entries_json(entries_json: &[u8]) -> Result<Self> {
        let entries: Vec<DictEntry> = serde_json::from_slice(entries_json)?;
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, id: RecordId) -> Option<&Arc<DictEntry>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn universe(&self) -> &IdSet {
        &self.universe
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Materializes records for `ids`, skipping unknown ones, in the
    /// iteration order of `ids`.
    pub fn entries_for<'a, I>(&self, ids: I) -> Vec<Arc<DictEntry>>
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        ids.into_iter()
            .filter_map(|id| self.entries.get(id).cloned())
            .collect()
    }
}
