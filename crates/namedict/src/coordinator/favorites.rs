use std::collections::{BTreeSet, HashSet};

use dictionary::RecordId;

/// Favorite ids, most recently added first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteList {
    order: Vec<RecordId>,
}

impl FavoriteList {
    /// Keeps the first occurrence of each id accepted by `known`.
    pub fn sanitized<F>(order: &[RecordId], known: F) -> Self
    where
        F: Fn(RecordId) -> bool,
    {
        let mut seen = HashSet::with_capacity(order.len());
        let order = order
            .iter()
            .copied()
            .filter(|id| known(*id) && seen.insert(*id))
            .collect();
        Self { order }
    }

    /// Removes `id` if present, otherwise puts it first. Returns whether
    /// the id is now a favorite.
    pub fn toggle(&mut self, id: RecordId) -> bool {
        if let Some(position) = self.order.iter().position(|existing| *existing == id) {
            self.order.remove(position);
            false
        } else {
            self.order.insert(0, id);
            true
        }
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.order.contains(&id)
    }

    pub fn order(&self) -> &[RecordId] {
        &self.order
    }

    pub fn ids(&self) -> BTreeSet<RecordId> {
        self.order.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
