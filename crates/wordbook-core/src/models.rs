//! Data models for wordbook
//!
//! An `Entry` is the unit handed out to callers. On disk and in memory the
//! dictionary is a plain word → definition map (`Entries`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Word → definition mapping, as stored in memory and on disk.
///
/// Keys are case-sensitive and unique.
pub type Entries = BTreeMap<String, String>;

/// A single dictionary entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// The word (unique key)
    pub word: String,
    /// Its definition
    pub definition: String,
}

impl Entry {
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            definition: definition.into(),
        }
    }

    /// Build the entry list for a mapping, ascending by word
    pub fn sorted_from(entries: &Entries) -> Vec<Entry> {
        entries
            .iter()
            .map(|(word, definition)| Entry::new(word.clone(), definition.clone()))
            .collect()
    }
}
