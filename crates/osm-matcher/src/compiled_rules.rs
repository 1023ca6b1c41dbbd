use std::collections::BTreeSet;
use tracing::{debug, debug_span};

use osm_matcher_rules::MatchRules;

use crate::error::MatcherError;
use crate::name_match::NameMatcher;
use crate::pattern_cache::PatternCache;
use crate::tag_filter::TagPredicate;

/// Match rules prepared for use by a `Matcher`.
///
/// A single `CompiledRules` is meant to be shared by every `Matcher` in a process; it owns the
/// `PatternCache`, which fills up as names and addresses are compared.
pub struct CompiledRules {
    pub(crate) rules: MatchRules,
    pub(crate) incompatible: Vec<TagPredicate>,
    pub(crate) category_keys: BTreeSet<String>,
    pub(crate) cache: PatternCache,
}

impl CompiledRules {
    /// Check and prepare the given rules.
    pub fn from_rules(rules: MatchRules) -> Result<Self, MatcherError> {
        let _span = debug_span!("CompiledRules::from_rules").entered();

        if rules.name_keys.is_empty() {
            return Err(MatcherError::InvalidRule("no name keys are configured".into()));
        }

        for affix in rules.affixes.prefixes.iter().chain(rules.affixes.suffixes.iter()) {
            if affix.trim().is_empty() {
                return Err(MatcherError::InvalidRule("empty affix".into()));
            }
            if *affix != crate::name_match::normalize(affix) {
                return Err(MatcherError::InvalidRule(format!(
                    "affix {affix:?} is not in normalized form"
                )));
            }
        }

        let incompatible = rules
            .incompatible_categories
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<TagPredicate>, _>>()?;

        let category_keys = rules.category_keys.iter().cloned().collect();

        debug!(
            "Compiled {} rule entries: {} incompatible categories",
            rules.num_entries(),
            incompatible.len()
        );
        Ok(CompiledRules {
            rules,
            incompatible,
            category_keys,
            cache: PatternCache::new(),
        })
    }

    #[inline]
    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    #[inline]
    pub fn pattern_cache(&self) -> &PatternCache {
        &self.cache
    }

    /// The parsed incompatible-category predicates.
    #[inline]
    pub fn incompatible_categories(&self) -> &[TagPredicate] {
        &self.incompatible
    }

    #[inline]
    pub fn is_category_key(&self, key: &str) -> bool {
        self.category_keys.contains(key)
    }

    pub(crate) fn name_matcher(&self) -> NameMatcher<'_> {
        NameMatcher {
            name_keys: &self.rules.name_keys,
            affixes: &self.rules.affixes,
            cache: &self.cache,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use osm_matcher_rules::NameKeys;
    use pretty_assertions::assert_eq;

    fn minimal() -> MatchRules {
        MatchRules {
            name_keys: NameKeys {
                primary: vec!["name".into()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn compiles_incompatible_categories() -> Result<(), MatcherError> {
        let mut rules = minimal();
        rules.incompatible_categories = vec!["amenity=parking".into(), "parking".into()];
        let compiled = CompiledRules::from_rules(rules)?;
        assert_eq!(
            compiled.incompatible_categories(),
            &[
                TagPredicate::KeyValue { key: "amenity".into(), value: "parking".into() },
                TagPredicate::Key("parking".into()),
            ]
        );
        Ok(())
    }

    #[test]
    fn rejects_bad_rules() {
        assert!(CompiledRules::from_rules(MatchRules::new()).is_err());

        let mut rules = minimal();
        rules.incompatible_categories = vec!["=parking".into()];
        assert!(CompiledRules::from_rules(rules).is_err());

        let mut rules = minimal();
        rules.affixes.suffixes = vec!["Public House".into()];
        assert!(CompiledRules::from_rules(rules).is_err());
    }
}
