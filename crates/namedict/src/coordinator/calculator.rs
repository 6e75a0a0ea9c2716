use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use dictionary::{filter_ids_cancellable, CancellationToken, DictEntry, Dictionary, IdSet, Selection};

/// Filter result: matching ids plus their records in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct FilteredSet {
    pub ids: Arc<IdSet>,
    pub entries: Arc<Vec<Arc<DictEntry>>>,
}

impl FilteredSet {
    fn from_ids(dictionary: &Dictionary, ids: IdSet) -> Self {
        let entries = dictionary.entries_for(&ids);
        Self {
            ids: Arc::new(ids),
            entries: Arc::new(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A loaded dictionary with the unfiltered view prepared once, so clearing
/// the selection never rebuilds the full list.
#[derive(Debug)]
pub struct Catalog {
    dictionary: Arc<Dictionary>,
    everything: FilteredSet,
}

impl Catalog {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        let everything = FilteredSet::from_ids(&dictionary, dictionary.universe().clone());
        Self {
            dictionary,
            everything,
        }
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn everything(&self) -> &FilteredSet {
        &self.everything
    }

    /// Runs the filter; `None` once `token` has been superseded.
    pub fn filter(&self, selection: &Selection, token: &CancellationToken) -> Option<FilteredSet> {
        let ids = filter_ids_cancellable(
            self.dictionary.index(),
            selection,
            self.dictionary.universe(),
            token,
        )?;
        match ids {
            Cow::Borrowed(_) => Some(self.everything.clone()),
            Cow::Owned(ids) => {
                token.check()?;
                Some(FilteredSet::from_ids(&self.dictionary, ids))
            }
        }
    }
}

/// Runs filter recomputations away from the task that applies them.
#[async_trait]
pub trait FilterCalculator: Send + Sync {
    async fn compute(
        &self,
        catalog: Arc<Catalog>,
        selection: Selection,
        token: CancellationToken,
    ) -> Option<FilteredSet>;
}

/// Computes on tokio's blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingFilterCalculator;

#[async_trait]
impl FilterCalculator for BlockingFilterCalculator {
    async fn compute(
        &self,
        catalog: Arc<Catalog>,
        selection: Selection,
        token: CancellationToken,
    ) -> Option<FilteredSet> {
        match tokio::task::spawn_blocking(move || catalog.filter(&selection, &token)).await {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!("filter task failed: {error}");
                None
            }
        }
    }
}
