//! Precomputed inverted index: category -> facet value -> ordered record ids.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::category::{sort_index_values, IndexCategory};
use crate::record::{DictEntry, RecordId};

/// Set of record ids in ascending order.
pub type IdSet = BTreeSet<RecordId>;

/// The raw shape of `index.json`.
pub type RawIndex = HashMap<String, HashMap<String, Vec<RecordId>>>;

/// Immutable facet index.
///
/// Every id list is sorted ascending and free of duplicates, and every id
/// is a member of the universe the index was built against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetIndex {
    categories: BTreeMap<IndexCategory, BTreeMap<String, Vec<RecordId>>>,
}

impl FacetIndex {
    /// Builds an index from the bundle representation.
    ///
    /// Unknown category keys are ignored and ids outside `universe` are
    /// dropped, so the resulting index always satisfies its invariant.
    pub fn from_raw(raw: RawIndex, universe: &IdSet) -> Self {
        let mut categories = BTreeMap::new();
        let mut dropped = 0usize;

        for (category_key, values) in raw {
            let Some(category) = IndexCategory::from_key(&category_key) else {
                log::debug!("skipping unknown index category {category_key}");
                continue;
            };
            let mut entries = BTreeMap::new();
            for (value, mut ids) in values {
                let before = ids.len();
                ids.retain(|id| universe.contains(id));
                dropped += before - ids.len();
                ids.sort_unstable();
                ids.dedup();
                entries.insert(value, ids);
            }
            categories.insert(category, entries);
        }

        if dropped > 0 {
            log::warn!("facet index referenced {dropped} ids outside the record set; dropped them");
        }

        Self { categories }
    }

    /// Derives an index directly from record attributes.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a DictEntry>,
    {
        let mut categories: BTreeMap<IndexCategory, BTreeMap<String, Vec<RecordId>>> =
            BTreeMap::new();
        for entry in entries {
            for category in IndexCategory::ALL {
                for value in entry.facet_values(category) {
                    categories
                        .entry(category)
                        .or_default()
                        .entry(value)
                        .or_default()
                        .push(entry.id);
                }
            }
        }
        for values in categories.values_mut() {
            for ids in values.values_mut() {
                ids.sort_unstable();
                ids.dedup();
            }
        }
        Self { categories }
    }

    /// Ids for one facet value; an absent value yields an empty slice.
    pub fn ids(&self, category: IndexCategory, value: &str) -> &[RecordId] {
        self.categories
            .get(&category)
            .and_then(|values| values.get(value))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains_value(&self, category: IndexCategory, value: &str) -> bool {
        self.categories
            .get(&category)
            .is_some_and(|values| values.contains_key(value))
    }

    /// Values of a category in display order.
    pub fn values(&self, category: IndexCategory) -> Vec<&str> {
        match self.categories.get(&category) {
            Some(values) => sort_index_values(values.keys().map(String::as_str), category),
            None => Vec::new(),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = IndexCategory> + '_ {
        self.categories.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
