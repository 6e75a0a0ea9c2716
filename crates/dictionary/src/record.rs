//! Dictionary records as shipped in the bundle.

use serde::{Deserialize, Serialize};

use crate::category::IndexCategory;

/// Stable identity of a record.
pub type RecordId = u32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictEntry {
    pub id: RecordId,
    pub char: String,
    pub phonetics: Phonetics,
    pub structure: Structure,
    pub unicode: String,
    pub gscc: String,
    pub definitions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phonetics {
    pub pinyin: Vec<String>,
    pub initials: Vec<String>,
    pub finals: Vec<String>,
    pub tones: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Structure {
    pub radical: String,
    pub strokes_total: i32,
    pub strokes_other: i32,
    pub structure_type: String,
}

impl DictEntry {
    /// Facet values this record contributes to `category`.
    ///
    /// Empty strings are skipped so a missing attribute never becomes a
    /// selectable value.
    pub fn facet_values(&self, category: IndexCategory) -> Vec<String> {
        let values = match category {
            IndexCategory::StructureRadical => vec![self.structure.radical.clone()],
            IndexCategory::StructureStrokesTotal => vec![self.structure.strokes_total.to_string()],
            IndexCategory::StructureStrokesOther => vec![self.structure.strokes_other.to_string()],
            IndexCategory::StructureType => vec![self.structure.structure_type.clone()],
            IndexCategory::PhoneticsPinyin => self.phonetics.pinyin.clone(),
            IndexCategory::PhoneticsInitials => self.phonetics.initials.clone(),
            IndexCategory::PhoneticsFinals => self.phonetics.finals.clone(),
            IndexCategory::PhoneticsTones => {
                self.phonetics.tones.iter().map(i32::to_string).collect()
            }
        };
        values.into_iter().filter(|value| !value.is_empty()).collect()
    }
}
