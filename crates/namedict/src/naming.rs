//! Drafted given-name plans: a surname plus candidate schemes whose slots
//! are filled from favorite characters.

use serde::{Deserialize, Serialize};

pub const MAX_SURNAME_CHARS: usize = 4;
pub const MAX_SLOT_CHARS: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GivenNameMode {
    Single,
    #[default]
    Double,
}

impl GivenNameMode {
    pub fn slot_count(self) -> usize {
        match self {
            GivenNameMode::Single => 1,
            GivenNameMode::Double => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingGender {
    #[default]
    Unisex,
    Male,
    Female,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamingScheme {
    pub id: i64,
    pub given_name_mode: GivenNameMode,
    pub gender: NamingGender,
    pub slot1: String,
    pub slot2: String,
}

impl NamingScheme {
    fn slot_mut(&mut self, slot_index: usize) -> Option<&mut String> {
        match slot_index {
            0 => Some(&mut self.slot1),
            1 if self.given_name_mode == GivenNameMode::Double => Some(&mut self.slot2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamingDraft {
    pub surname: String,
    pub schemes: Vec<NamingScheme>,
    pub active_scheme_id: Option<i64>,
    pub active_slot_index: usize,
}

/// Keeps at most `max` Unicode scalar values.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

impl NamingDraft {
    pub fn scheme(&self, id: i64) -> Option<&NamingScheme> {
        self.schemes.iter().find(|scheme| scheme.id == id)
    }

    fn scheme_mut(&mut self, id: i64) -> Option<&mut NamingScheme> {
        self.schemes.iter_mut().find(|scheme| scheme.id == id)
    }

    pub fn set_surname(&mut self, value: &str) -> bool {
        let surname = truncate_chars(value.trim(), MAX_SURNAME_CHARS);
        if surname == self.surname {
            return false;
        }
        self.surname = surname;
        true
    }

    /// Appends a new double-slot scheme and focuses its first slot.
    pub fn add_scheme(&mut self) -> i64 {
        let id = self.next_scheme_id();
        self.schemes.push(NamingScheme {
            id,
            ..NamingScheme::default()
        });
        self.active_scheme_id = Some(id);
        self.active_slot_index = 0;
        id
    }

    /// One past the largest id, or the smallest free positive id once the
    /// largest is `i64::MAX`.
    fn next_scheme_id(&self) -> i64 {
        let max = self.schemes.iter().map(|scheme| scheme.id).max().unwrap_or(0);
        max.checked_add(1)
            .or_else(|| (1..i64::MAX).find(|candidate| self.scheme(*candidate).is_none()))
            .unwrap_or(0)
    }

    pub fn remove_scheme(&mut self, id: i64) -> bool {
        let before = self.schemes.len();
        self.schemes.retain(|scheme| scheme.id != id);
        if self.schemes.len() == before {
            return false;
        }
        if self.active_scheme_id == Some(id) {
            self.active_scheme_id = self.schemes.first().map(|scheme| scheme.id);
            self.active_slot_index = 0;
        }
        true
    }

    /// Switches mode without clearing slot text, so switching back restores it.
    pub fn set_mode(&mut self, id: i64, mode: GivenNameMode) -> bool {
        let Some(scheme) = self.scheme_mut(id) else {
            return false;
        };
        if scheme.given_name_mode == mode {
            return false;
        }
        scheme.given_name_mode = mode;
        if self.active_scheme_id == Some(id) && self.active_slot_index >= mode.slot_count() {
            self.active_slot_index = 0;
        }
        true
    }

    pub fn set_gender(&mut self, id: i64, gender: NamingGender) -> bool {
        match self.scheme_mut(id) {
            Some(scheme) if scheme.gender != gender => {
                scheme.gender = gender;
                true
            }
            _ => false,
        }
    }

    pub fn set_active_slot(&mut self, id: i64, slot_index: usize) -> bool {
        let Some(scheme) = self.scheme(id) else {
            return false;
        };
        let slot_index = slot_index.min(scheme.given_name_mode.slot_count() - 1);
        if self.active_scheme_id == Some(id) && self.active_slot_index == slot_index {
            return false;
        }
        self.active_scheme_id = Some(id);
        self.active_slot_index = slot_index;
        true
    }

    pub fn update_slot_text(&mut self, id: i64, slot_index: usize, value: &str) -> bool {
        let text = truncate_chars(value.trim(), MAX_SLOT_CHARS);
        let Some(slot) = self
            .scheme_mut(id)
            .and_then(|scheme| scheme.slot_mut(slot_index))
        else {
            return false;
        };
        if *slot == text {
            return false;
        }
        *slot = text;
        true
    }

    /// Writes a favorite character into the focused slot, if any.
    pub fn fill_active_slot(&mut self, value: &str) -> bool {
        match self.active_scheme_id {
            Some(id) => self.update_slot_text(id, self.active_slot_index, value),
            None => false,
        }
    }

    /// Normalizes a draft read from storage or a remote payload.
    pub fn sanitized(mut self) -> Self {
        self.surname = truncate_chars(self.surname.trim(), MAX_SURNAME_CHARS);
        for scheme in &mut self.schemes {
            scheme.slot1 = truncate_chars(&scheme.slot1, MAX_SLOT_CHARS);
            scheme.slot2 = truncate_chars(&scheme.slot2, MAX_SLOT_CHARS);
        }
        let mut seen = std::collections::HashSet::new();
        self.schemes.retain(|scheme| seen.insert(scheme.id));

        let active = self
            .active_scheme_id
            .and_then(|id| self.scheme(id))
            .or_else(|| self.schemes.first());
        match active {
            Some(scheme) => {
                let slot_count = scheme.given_name_mode.slot_count();
                self.active_scheme_id = Some(scheme.id);
                if self.active_slot_index >= slot_count {
                    self.active_slot_index = 0;
                }
            }
            None => {
                self.active_scheme_id = None;
                self.active_slot_index = 0;
            }
        }
        self
    }
}
