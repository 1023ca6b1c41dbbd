use serde::{Deserialize, Serialize};

use crate::util::extend_unique;

// -------------------------------------------------------------------------------------------------
// NameKeys
// -------------------------------------------------------------------------------------------------
/// The OSM tag keys whose values are compared against an item's names.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct NameKeys {
    /// Keys that state what a feature is called, e.g., `name` or `addr:housename`
    #[serde(default)]
    pub primary: Vec<String>,

    /// Keys that carry a related name, e.g., `operator` or `previous_name`
    #[serde(default)]
    pub secondary: Vec<String>,

    /// Key prefixes that mark further secondary keys, e.g., `name:` for `name:en`
    #[serde(default)]
    pub secondary_prefixes: Vec<String>,
}

impl NameKeys {
    pub fn update(&mut self, other: NameKeys) {
        extend_unique(&mut self.primary, other.primary);
        extend_unique(&mut self.secondary, other.secondary);
        extend_unique(&mut self.secondary_prefixes, other.secondary_prefixes);
    }

    /// Is `key` one of the primary name keys?
    pub fn is_primary(&self, key: &str) -> bool {
        self.primary.iter().any(|k| k == key)
    }

    /// Is `key` a secondary name key, either listed explicitly or by prefix?
    pub fn is_secondary(&self, key: &str) -> bool {
        self.secondary.iter().any(|k| k == key)
            || self.secondary_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }

    /// Is `key` any kind of name key?
    pub fn is_name_key(&self, key: &str) -> bool {
        self.is_primary(key) || self.is_secondary(key)
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.secondary.is_empty() && self.secondary_prefixes.is_empty()
    }
}

// -------------------------------------------------------------------------------------------------
// Affixes
// -------------------------------------------------------------------------------------------------
/// Descriptive words that may be stripped from a name before comparing, e.g., the `Inn` in
/// `The Castle Inn`.
///
/// Entries are written in normalized form: lowercase, words separated by single spaces.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Affixes {
    #[serde(default)]
    pub prefixes: Vec<String>,

    #[serde(default)]
    pub suffixes: Vec<String>,
}

impl Affixes {
    pub fn update(&mut self, other: Affixes) {
        extend_unique(&mut self.prefixes, other.prefixes);
        extend_unique(&mut self.suffixes, other.suffixes);
    }

    /// Is `s` entirely made up of one affix?
    pub fn is_affix(&self, s: &str) -> bool {
        self.prefixes.iter().chain(self.suffixes.iter()).any(|a| a == s)
    }
}
