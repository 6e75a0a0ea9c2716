use std::collections::BTreeSet;
use std::sync::Arc;

use dictionary::{DictEntry, IndexCategory, RecordId, Selection};

use crate::coordinator::calculator::FilteredSet;
use crate::naming::NamingDraft;
use crate::prefs::ScrollAnchor;
use crate::sync::SyncConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Progress of the latest filter recomputation, tagged with its version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecomputeState {
    #[default]
    Idle,
    Computing(u64),
    Applied(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Running(SyncTrigger),
}

impl SyncState {
    pub fn is_running(self) -> bool {
        matches!(self, SyncState::Running(_))
    }
}

/// The single state value observed by consumers. Replaced as a whole on
/// every update; large lists are shared behind `Arc`.
#[derive(Debug, Clone, Default)]
pub struct DictSnapshot {
    pub load_state: LoadState,
    pub selected_category: IndexCategory,
    /// Selection that produced `filtered`.
    pub selection: Selection,
    pub filtered: FilteredSet,
    pub recompute: RecomputeState,
    pub favorite_order: Vec<RecordId>,
    pub favorite_ids: BTreeSet<RecordId>,
    pub favorite_entries: Vec<Arc<DictEntry>>,
    pub favorites_only: bool,
    pub selected_entry: Option<RecordId>,
    pub main_scroll: ScrollAnchor,
    pub favorites_scroll: ScrollAnchor,
    pub sync_config: SyncConfig,
    pub sync_state: SyncState,
    pub last_sync_message: Option<String>,
    pub naming: NamingDraft,
}

impl DictSnapshot {
    pub fn is_favorite(&self, id: RecordId) -> bool {
        self.favorite_ids.contains(&id)
    }

    /// Entries of the list currently on screen.
    pub fn visible_entries(&self) -> &[Arc<DictEntry>] {
        if self.favorites_only {
            &self.favorite_entries
        } else {
            &self.filtered.entries
        }
    }
}
