use std::sync::Arc;

use dictionary::RecordId;

use crate::coordinator::{Shared, StateCoordinator};
use crate::naming::{GivenNameMode, NamingDraft, NamingGender};

impl StateCoordinator {
    pub fn update_naming_surname(&self, value: &str) -> bool {
        self.shared.edit_naming(|draft| draft.set_surname(value))
    }

    /// Adds a scheme, focuses it and returns its id.
    pub fn add_naming_scheme(&self) -> i64 {
        let mut id = 0;
        self.shared.edit_naming(|draft| {
            id = draft.add_scheme();
            true
        });
        id
    }

    pub fn remove_naming_scheme(&self, id: i64) -> bool {
        self.shared.edit_naming(|draft| draft.remove_scheme(id))
    }

    pub fn set_naming_mode(&self, id: i64, mode: GivenNameMode) -> bool {
        self.shared.edit_naming(|draft| draft.set_mode(id, mode))
    }

    pub fn set_naming_gender(&self, id: i64, gender: NamingGender) -> bool {
        self.shared.edit_naming(|draft| draft.set_gender(id, gender))
    }

    pub fn set_active_naming_slot(&self, id: i64, slot_index: usize) -> bool {
        self.shared
            .edit_naming(|draft| draft.set_active_slot(id, slot_index))
    }

    pub fn update_naming_slot_text(&self, id: i64, slot_index: usize, value: &str) -> bool {
        self.shared
            .edit_naming(|draft| draft.update_slot_text(id, slot_index, value))
    }

    /// Puts the character of favorite `id` into the focused slot.
    pub fn fill_active_slot_from_favorite(&self, id: RecordId) -> bool {
        let Some(catalog) = self.shared.catalog() else {
            return false;
        };
        if !self.shared.state.lock().favorites.contains(id) {
            return false;
        }
        let Some(entry) = catalog.dictionary().get(id) else {
            return false;
        };
        let text = entry.char.clone();
        self.shared.edit_naming(|draft| draft.fill_active_slot(&text))
    }
}

impl Shared {
    /// Applies an edit to the draft; a change is persisted and re-arms the
    /// deferred upload.
    fn edit_naming<F>(self: &Arc<Self>, edit: F) -> bool
    where
        F: FnOnce(&mut NamingDraft) -> bool,
    {
        let changed = self
            .snapshot
            .send_if_modified(|state| edit(&mut state.naming));
        if changed {
            self.persist_naming();
            self.schedule_auto_upload();
        }
        changed
    }
}
