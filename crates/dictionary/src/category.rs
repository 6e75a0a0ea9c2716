//! Fixed facet categories and their value ordering rules.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How the values of a category are ordered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSort {
    /// Plain lexical ordering.
    Alpha,
    /// Integers ascend numerically; anything unparsable sorts after them.
    Numeric,
}

/// A facet dimension of the dictionary.
///
/// Variant order is the deterministic processing order used by the filter
/// engine and by `Selection` iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexCategory {
    #[serde(rename = "structure.radical")]
    StructureRadical,
    #[serde(rename = "structure.strokes_total")]
    StructureStrokesTotal,
    #[serde(rename = "structure.strokes_other")]
    StructureStrokesOther,
    #[serde(rename = "structure.structure_type")]
    StructureType,
    #[serde(rename = "phonetics.pinyin")]
    PhoneticsPinyin,
    #[serde(rename = "phonetics.initials")]
    PhoneticsInitials,
    #[serde(rename = "phonetics.finals")]
    PhoneticsFinals,
    #[serde(rename = "phonetics.tones")]
    PhoneticsTones,
}

impl IndexCategory {
    pub const ALL: [IndexCategory; 8] = [
        IndexCategory::StructureRadical,
        IndexCategory::StructureStrokesTotal,
        IndexCategory::StructureStrokesOther,
        IndexCategory::StructureType,
        IndexCategory::PhoneticsPinyin,
        IndexCategory::PhoneticsInitials,
        IndexCategory::PhoneticsFinals,
        IndexCategory::PhoneticsTones,
    ];

    /// Stable key used in the index bundle and in persisted preferences.
    pub fn key(self) -> &'static str {
        match self {
            IndexCategory::StructureRadical => "structure.radical",
            IndexCategory::StructureStrokesTotal => "structure.strokes_total",
            IndexCategory::StructureStrokesOther => "structure.strokes_other",
            IndexCategory::StructureType => "structure.structure_type",
            IndexCategory::PhoneticsPinyin => "phonetics.pinyin",
            IndexCategory::PhoneticsInitials => "phonetics.initials",
            IndexCategory::PhoneticsFinals => "phonetics.finals",
            IndexCategory::PhoneticsTones => "phonetics.tones",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IndexCategory::StructureRadical => "Radical",
            IndexCategory::StructureStrokesTotal => "Strokes Total",
            IndexCategory::StructureStrokesOther => "Strokes Other",
            IndexCategory::StructureType => "Structure Type",
            IndexCategory::PhoneticsPinyin => "Pinyin",
            IndexCategory::PhoneticsInitials => "Initials",
            IndexCategory::PhoneticsFinals => "Finals",
            IndexCategory::PhoneticsTones => "Tones",
        }
    }

    pub fn sort(self) -> ValueSort {
        match self {
            IndexCategory::StructureStrokesTotal
            | IndexCategory::StructureStrokesOther
            | IndexCategory::PhoneticsTones => ValueSort::Numeric,
            _ => ValueSort::Alpha,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }
}

impl Default for IndexCategory {
    fn default() -> Self {
        IndexCategory::StructureRadical
    }
}

impl fmt::Display for IndexCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Orders facet values for display according to the category's rule.
pub fn sort_index_values<'a, I>(values: I, category: IndexCategory) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sorted: Vec<&str> = values.into_iter().collect();
    match category.sort() {
        ValueSort::Alpha => sorted.sort_unstable(),
        ValueSort::Numeric => sorted.sort_unstable_by(|a, b| compare_numeric(a, b)),
    }
    sorted.dedup();
    sorted
}

fn compare_numeric(a: &str, b: &str) -> Ordering {
    let left = a.parse::<i64>().ok();
    let right = b.parse::<i64>().ok();
    match (left, right) {
        (Some(l), Some(r)) => l.cmp(&r).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
