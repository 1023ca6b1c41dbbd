use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::MatcherError;

// -------------------------------------------------------------------------------------------------
// PatternCache
// -------------------------------------------------------------------------------------------------
/// Compiled whole-word matchers for literal strings, keyed by the literal.
///
/// The cache is unbounded: the set of literals is bounded by the names and addresses that get
/// compared. It is safe to share between threads. Two threads racing to compile the same literal
/// both produce an equivalent matcher; whichever is inserted first is kept.
#[derive(Default)]
pub struct PatternCache {
    patterns: RwLock<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a matcher for `text` as a whole word (or phrase), compiling it if necessary.
    ///
    /// Regex metacharacters in `text` are escaped.
    pub fn get_pattern(&self, text: &str) -> Result<Arc<Regex>, MatcherError> {
        if let Some(re) = self
            .patterns
            .read()
            .expect("pattern cache lock should not be poisoned")
            .get(text)
        {
            return Ok(Arc::clone(re));
        }

        let re = Regex::new(&format!(r"\b{}\b", regex::escape(text))).map_err(|source| {
            MatcherError::PatternCompilation {
                literal: text.to_owned(),
                source,
            }
        })?;

        let mut patterns = self
            .patterns
            .write()
            .expect("pattern cache lock should not be poisoned");
        let re = patterns
            .entry(text.to_owned())
            .or_insert_with(|| Arc::new(re));
        Ok(Arc::clone(re))
    }

    /// Does `haystack` contain `needle` as a whole word (or phrase)?
    pub fn contains_word(&self, haystack: &str, needle: &str) -> Result<bool, MatcherError> {
        Ok(self.get_pattern(needle)?.is_match(haystack))
    }

    /// How many literals have been compiled?
    pub fn len(&self) -> usize {
        self.patterns
            .read()
            .expect("pattern cache lock should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
