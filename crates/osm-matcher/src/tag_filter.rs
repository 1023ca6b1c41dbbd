use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::MatcherError;

// -------------------------------------------------------------------------------------------------
// TagPredicate
// -------------------------------------------------------------------------------------------------
/// One entry of a tag filter: either a bare key (`building`), satisfied by any value, or a
/// `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagPredicate {
    Key(String),
    KeyValue { key: String, value: String },
}

impl TagPredicate {
    pub fn key(&self) -> &str {
        match self {
            TagPredicate::Key(key) => key,
            TagPredicate::KeyValue { key, .. } => key,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            TagPredicate::Key(_) => None,
            TagPredicate::KeyValue { value, .. } => Some(value),
        }
    }

    /// Does a feature with the given tags satisfy this predicate?
    pub fn is_satisfied_by(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            TagPredicate::Key(key) => tags.contains_key(key),
            TagPredicate::KeyValue { key, value } => tags.get(key) == Some(value),
        }
    }
}

impl std::str::FromStr for TagPredicate {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (s, None),
        };
        if key.is_empty() {
            return Err(MatcherError::InvalidRule(format!("tag predicate {s:?} has an empty key")));
        }
        Ok(match value {
            None => TagPredicate::Key(key.to_owned()),
            Some(value) => TagPredicate::KeyValue {
                key: key.to_owned(),
                value: value.to_owned(),
            },
        })
    }
}

impl TryFrom<String> for TagPredicate {
    type Error = MatcherError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TagPredicate> for String {
    fn from(p: TagPredicate) -> String {
        p.to_string()
    }
}

impl std::fmt::Display for TagPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagPredicate::Key(key) => write!(f, "{key}"),
            TagPredicate::KeyValue { key, value } => write!(f, "{key}={value}"),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// simplify_tags
// -------------------------------------------------------------------------------------------------
/// Remove `key=value` entries that are subsumed by a bare `key` entry.
///
/// The order of the remaining entries is preserved.
///
/// ```
/// # use osm_matcher::tag_filter::simplify_tags;
/// let tags = ["building", "building=yes", "amenity=pub"];
/// assert_eq!(simplify_tags(&tags), vec!["building", "amenity=pub"]);
/// ```
pub fn simplify_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let bare_keys: BTreeSet<&str> = tags
        .iter()
        .map(|t| t.as_ref())
        .filter(|t| !t.contains('='))
        .collect();

    tags.iter()
        .map(|t| t.as_ref())
        .filter(|t| match t.split_once('=') {
            Some((key, _)) => !bare_keys.contains(key),
            None => true,
        })
        .map(|t| t.to_owned())
        .collect()
}

// -------------------------------------------------------------------------------------------------
// TagFilter
// -------------------------------------------------------------------------------------------------
/// The deduplicated, simplified tag filter of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagFilter {
    predicates: Vec<TagPredicate>,
}

impl TagFilter {
    /// Build a filter from predicate strings: duplicates are removed keeping the first
    /// occurrence, then the result is simplified.
    pub fn new<S: AsRef<str>>(tags: &[S]) -> Result<Self, MatcherError> {
        let mut seen = BTreeSet::new();
        let deduped: Vec<&str> = tags
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| seen.insert(*t))
            .collect();

        let predicates = simplify_tags(&deduped)
            .iter()
            .map(|t| t.parse())
            .collect::<Result<Vec<TagPredicate>, _>>()?;
        Ok(Self { predicates })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TagPredicate> {
        self.predicates.iter()
    }

    /// Does the filter contain exactly this predicate?
    pub fn contains(&self, predicate: &TagPredicate) -> bool {
        self.predicates.contains(predicate)
    }

    /// Does the filter ask for the bare key `key`?
    pub fn has_bare_key(&self, key: &str) -> bool {
        self.predicates
            .iter()
            .any(|p| matches!(p, TagPredicate::Key(k) if k == key))
    }

    /// The values the filter asks for on `key`, in filter order.
    pub fn values_for_key<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.predicates
            .iter()
            .filter(move |p| p.key() == key)
            .filter_map(|p| p.value())
    }

    /// The filter keys that a feature with the given tags also carries, whatever their values.
    pub fn matching_tags(&self, tags: &BTreeMap<String, String>) -> BTreeSet<String> {
        self.predicates
            .iter()
            .map(|p| p.key())
            .filter(|key| tags.contains_key(*key))
            .map(|key| key.to_owned())
            .collect()
    }

    /// The predicates that a feature with the given tags satisfies, in filter order.
    pub fn satisfied_predicates<'a>(
        &'a self,
        tags: &BTreeMap<String, String>,
    ) -> Vec<&'a TagPredicate> {
        self.predicates
            .iter()
            .filter(|p| p.is_satisfied_by(tags))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TagFilter {
    type Item = &'a TagPredicate;
    type IntoIter = std::slice::Iter<'a, TagPredicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
