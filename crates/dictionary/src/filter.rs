//! Faceted filtering over a [`FacetIndex`].

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::category::IndexCategory;
use crate::index::{FacetIndex, IdSet};

/// Chosen facet values per category.
///
/// A category is present only with a non-empty value set; an empty
/// selection matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection(BTreeMap<IndexCategory, BTreeSet<String>>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self, category: IndexCategory) -> Option<&BTreeSet<String>> {
        self.0.get(&category)
    }

    pub fn contains(&self, category: IndexCategory, value: &str) -> bool {
        self.0
            .get(&category)
            .is_some_and(|values| values.contains(value))
    }

    pub fn has_category(&self, category: IndexCategory) -> bool {
        self.0.contains_key(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexCategory, &BTreeSet<String>)> {
        self.0.iter().map(|(category, values)| (*category, values))
    }

    /// Returns a copy with `value` added to or removed from `category`.
    pub fn toggled(&self, category: IndexCategory, value: &str) -> Self {
        let mut next = self.clone();
        let values = next.0.entry(category).or_default();
        if !values.remove(value) {
            values.insert(value.to_string());
        }
        if values.is_empty() {
            next.0.remove(&category);
        }
        next
    }

    pub fn without_category(&self, category: IndexCategory) -> Self {
        let mut next = self.clone();
        next.0.remove(&category);
        next
    }

    /// Replaces the values of one category; an empty set removes it.
    pub fn set_values<I, S>(&mut self, category: IndexCategory, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.0.remove(&category);
        } else {
            self.0.insert(category, values);
        }
    }

    /// Rebuilds a selection from its persisted form, keeping only known
    /// categories and values that exist in `index`.
    pub fn from_keyed(keyed: &BTreeMap<String, Vec<String>>, index: &FacetIndex) -> Self {
        let mut selection = Self::new();
        for (key, values) in keyed {
            let Some(category) = IndexCategory::from_key(key) else {
                continue;
            };
            let kept = values
                .iter()
                .filter(|value| index.contains_value(category, value))
                .cloned();
            selection.set_values(category, kept);
        }
        selection
    }

    /// Persisted form: category key -> sorted values.
    pub fn to_keyed(&self) -> BTreeMap<String, Vec<String>> {
        self.0
            .iter()
            .map(|(category, values)| {
                (category.key().to_string(), values.iter().cloned().collect())
            })
            .collect()
    }
}

/// Ids matching `selection`.
///
/// An empty selection borrows `universe` untouched. Otherwise each selected
/// category contributes the union of its values' id lists and the result
/// is the intersection of those unions.
pub fn filter_ids<'u>(
    index: &FacetIndex,
    selection: &Selection,
    universe: &'u IdSet,
) -> Cow<'u, IdSet> {
    match filter_ids_cancellable(index, selection, universe, &CancellationToken::noop()) {
        Some(ids) => ids,
        None => Cow::Owned(IdSet::new()),
    }
}

/// Same as [`filter_ids`], abandoning the work with `None` once `token`
/// is cancelled.
pub fn filter_ids_cancellable<'u>(
    index: &FacetIndex,
    selection: &Selection,
    universe: &'u IdSet,
    token: &CancellationToken,
) -> Option<Cow<'u, IdSet>> {
    if selection.is_empty() {
        return Some(Cow::Borrowed(universe));
    }

    let mut current: Option<IdSet> = None;
    for (category, values) in selection.iter() {
        token.check()?;

        let mut union = IdSet::new();
        for value in values {
            union.extend(index.ids(category, value).iter().copied());
        }
        if union.is_empty() {
            return Some(Cow::Owned(IdSet::new()));
        }

        current = Some(match current {
            None => union,
            Some(mut acc) => {
                acc.retain(|id| union.contains(id));
                acc
            }
        });
        if current.as_ref().is_some_and(IdSet::is_empty) {
            return Some(Cow::Owned(IdSet::new()));
        }
    }

    token.check()?;
    let mut result = current.unwrap_or_default();
    result.retain(|id| universe.contains(id));
    Some(Cow::Owned(result))
}
