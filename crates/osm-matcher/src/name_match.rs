use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use osm_matcher_rules::{Affixes, NameKeys};

use crate::error::MatcherError;
use crate::pattern_cache::PatternCache;

// -------------------------------------------------------------------------------------------------
// MatchTier
// -------------------------------------------------------------------------------------------------
/// How confidently an OSM name value matches an item name.
///
/// Variants are declared weakest first, so `Ord` ranks `Good` highest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// The item name equals the OSM value once a descriptive affix is stripped from the item name
    WikidataTrimmed,

    /// The names are equal once an affix is stripped from each
    BothTrimmed,

    /// The OSM value equals the item name once a trailing suffix is stripped from the OSM value
    Trimmed,

    /// The names are equal, or one contains the other as whole words
    Good,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::WikidataTrimmed => "wikidata_trimmed",
            MatchTier::BothTrimmed => "both_trimmed",
            MatchTier::Trimmed => "trimmed",
            MatchTier::Good => "good",
        }
    }
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -------------------------------------------------------------------------------------------------
// NameSource / ItemName
// -------------------------------------------------------------------------------------------------
/// Where an item name came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum NameSource {
    /// A label in the given language
    Label(String),

    /// An alias in the given language
    Alias(String),

    /// A sitelink title on the given site
    Sitelink(String),
}

impl std::fmt::Display for NameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameSource::Label(lang) => write!(f, "label ({lang})"),
            NameSource::Alias(lang) => write!(f, "alias ({lang})"),
            NameSource::Sitelink(site) => write!(f, "sitelink ({site})"),
        }
    }
}

/// A distinct name of an item, together with every place it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemName {
    pub text: String,
    pub sources: Vec<NameSource>,
}

// -------------------------------------------------------------------------------------------------
// NameMatch
// -------------------------------------------------------------------------------------------------
/// One item name matched by one OSM name value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMatch {
    pub tier: MatchTier,

    /// The item name that matched, as written
    pub literal: String,

    pub sources: Vec<NameSource>,
}

/// Name matches keyed by the OSM tag key whose value matched.
pub type NameMatches = BTreeMap<String, Vec<NameMatch>>;

/// The strongest tier among the matches for one key.
pub fn best_tier(matches: &[NameMatch]) -> Option<MatchTier> {
    matches.iter().map(|m| m.tier).max()
}

// -------------------------------------------------------------------------------------------------
// Normalization
// -------------------------------------------------------------------------------------------------
/// Reduce a name to a comparable form.
///
/// The result is lowercase, with `&` spelled `and`, apostrophes dropped, any other
/// non-alphanumeric character treated as a space, and words separated by single spaces.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str(" and "),
            '\'' | '\u{2019}' => {}
            c if c.is_alphanumeric() => out.extend(c.to_lowercase()),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip at most one leading prefix and one trailing suffix from a normalized name.
///
/// Affixes are only removed at word boundaries, the longest matching suffix is preferred,
/// and the result is never empty. Returns `None` when nothing was stripped.
pub fn trim_affixes(name: &str, affixes: &Affixes) -> Option<String> {
    let mut rest = name;
    let mut stripped = false;

    if let Some(after) = affixes
        .prefixes
        .iter()
        .filter_map(|p| rest.strip_prefix(p.as_str())?.strip_prefix(' '))
        .min_by_key(|after| after.len())
    {
        rest = after;
        stripped = true;
    }

    if let Some(before) = strip_suffix(rest, affixes) {
        rest = before;
        stripped = true;
    }

    if stripped && !rest.is_empty() {
        Some(rest.to_owned())
    } else {
        None
    }
}

/// Strip the longest trailing suffix from a normalized name, leaving any prefix in place.
pub fn trim_suffix(name: &str, affixes: &Affixes) -> Option<String> {
    strip_suffix(name, affixes).map(str::to_owned)
}

fn strip_suffix<'n>(name: &'n str, affixes: &Affixes) -> Option<&'n str> {
    affixes
        .suffixes
        .iter()
        .filter_map(|s| name.strip_suffix(s.as_str())?.strip_suffix(' '))
        .filter(|before| !before.is_empty())
        .min_by_key(|before| before.len())
}

// -------------------------------------------------------------------------------------------------
// NameMatcher
// -------------------------------------------------------------------------------------------------
/// Compares OSM name values against item names.
pub struct NameMatcher<'a> {
    pub name_keys: &'a NameKeys,
    pub affixes: &'a Affixes,
    pub cache: &'a PatternCache,
}

impl<'a> NameMatcher<'a> {
    /// Determine the strongest tier at which `osm_value` matches `item_name`, if any.
    pub fn compare(&self, osm_value: &str, item_name: &str) -> Result<Option<MatchTier>, MatcherError> {
        let osm = normalize(osm_value);
        let wd = normalize(item_name);
        if osm.is_empty() || wd.is_empty() {
            return Ok(None);
        }

        if osm == wd || self.contains(&osm, &wd)? || self.contains(&wd, &osm)? {
            return Ok(Some(MatchTier::Good));
        }

        if trim_suffix(&osm, self.affixes).as_deref() == Some(wd.as_str()) {
            return Ok(Some(MatchTier::Trimmed));
        }

        let osm_trimmed = trim_affixes(&osm, self.affixes);
        let wd_trimmed = trim_affixes(&wd, self.affixes);
        if let (Some(o), Some(w)) = (&osm_trimmed, &wd_trimmed) {
            if o == w {
                return Ok(Some(MatchTier::BothTrimmed));
            }
        }
        if wd_trimmed.as_deref() == Some(osm.as_str()) {
            return Ok(Some(MatchTier::WikidataTrimmed));
        }
        Ok(None)
    }

    /// Does `haystack` contain `needle` as whole words, where `needle` is more than a bare
    /// descriptive word?
    fn contains(&self, haystack: &str, needle: &str) -> Result<bool, MatcherError> {
        if self.affixes.is_affix(needle) {
            return Ok(false);
        }
        self.cache.contains_word(haystack, needle)
    }

    /// Compare every name-bearing tag of a candidate against every item name.
    ///
    /// Keys without any match are omitted from the result.
    pub fn name_match(
        &self,
        osm_tags: &BTreeMap<String, String>,
        names: &[ItemName],
    ) -> Result<NameMatches, MatcherError> {
        let mut result = NameMatches::new();
        for (key, value) in osm_tags {
            if !self.name_keys.is_name_key(key) {
                continue;
            }
            for name in names {
                if let Some(tier) = self.compare(value, &name.text)? {
                    result.entry(key.clone()).or_default().push(NameMatch {
                        tier,
                        literal: name.text.clone(),
                        sources: name.sources.clone(),
                    });
                }
            }
        }
        Ok(result)
    }
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn affixes() -> Affixes {
        Affixes {
            prefixes: vec!["the".into()],
            suffixes: ["inn", "house", "public house", "center", "mall", "light", "church", "services"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    fn name_keys() -> NameKeys {
        NameKeys {
            primary: vec!["name".into()],
            secondary: vec!["operator".into()],
            secondary_prefixes: vec!["name:".into()],
        }
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(MatchTier::Good > MatchTier::Trimmed);
        assert!(MatchTier::Trimmed > MatchTier::BothTrimmed);
        assert!(MatchTier::BothTrimmed > MatchTier::WikidataTrimmed);
        assert_eq!(serde_json::to_string(&MatchTier::BothTrimmed).unwrap(), r#""both_trimmed""#);
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("St. Paul's Catholic Church"), "st pauls catholic church");
        assert_eq!(normalize("Samson & Lion"), "samson and lion");
        assert_eq!(normalize("  Welcome   Break\tGordano-Services "), "welcome break gordano services");
        assert_eq!(normalize("Saint Paul\u{2019}s"), "saint pauls");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn trimming() {
        let a = affixes();
        assert_eq!(trim_affixes("the castle inn", &a), Some("castle".into()));
        assert_eq!(trim_affixes("castle house", &a), Some("castle".into()));
        assert_eq!(trim_affixes("samson and lion public house", &a), Some("samson and lion".into()));
        assert_eq!(trim_affixes("castle", &a), None);
        // never strip down to nothing
        assert_eq!(trim_affixes("inn", &a), None);
        assert_eq!(trim_affixes("the inn", &a), Some("inn".into()));
        // only at word boundaries
        assert_eq!(trim_affixes("theatre royal", &a), None);
    }

    #[test]
    fn compare_tiers() -> Result<(), MatcherError> {
        let (keys, affixes, cache) = (name_keys(), affixes(), PatternCache::new());
        let m = NameMatcher { name_keys: &keys, affixes: &affixes, cache: &cache };

        assert_eq!(m.compare("Reunion Tower", "Reunion Tower")?, Some(MatchTier::Good));
        assert_eq!(
            m.compare("Welcome Break Gordano Services", "Gordano services")?,
            Some(MatchTier::Good)
        );
        assert_eq!(m.compare("Alcatraz Island", "Alcatraz Island Light")?, Some(MatchTier::Good));
        assert_eq!(m.compare("Castle Church", "Castle")?, Some(MatchTier::Good));
        assert_eq!(m.compare("Castle Inn", "The Castle")?, Some(MatchTier::BothTrimmed));
        assert_eq!(m.compare("Castle House", "The Castle Inn")?, Some(MatchTier::BothTrimmed));
        assert_eq!(m.compare("Oxmoor Mall", "Oxmoor Center")?, Some(MatchTier::BothTrimmed));
        assert_eq!(m.compare("Samson", "Samson Inn")?, Some(MatchTier::Good));
        assert_eq!(m.compare("Saint Paul's Catholic School", "St. Paul's Catholic Church")?, None);
        Ok(())
    }

    #[test]
    fn trimmed_and_wikidata_trimmed() -> Result<(), MatcherError> {
        let keys = name_keys();
        let affixes = Affixes { prefixes: vec!["the".into()], suffixes: vec!["inn".into(), "house".into()] };
        let cache = PatternCache::new();
        let m = NameMatcher { name_keys: &keys, affixes: &affixes, cache: &cache };

        // a bare affix never counts as contained, so these only match once trimmed
        assert_eq!(m.compare("Inn House", "Inn")?, Some(MatchTier::Trimmed));
        assert_eq!(m.compare("Inn", "Inn House")?, Some(MatchTier::WikidataTrimmed));
        assert_eq!(m.compare("Inn", "The Inn")?, Some(MatchTier::WikidataTrimmed));
        assert_eq!(m.compare("The Castle Inn", "Castle")?, Some(MatchTier::Good));

        // a leading prefix on the OSM side alone is not enough for the trimmed tier
        assert_eq!(m.compare("The Inn", "Inn")?, None);
        Ok(())
    }

    #[test]
    fn suffix_trimming() -> Result<(), MatcherError> {
        let a = affixes();
        assert_eq!(trim_suffix("the castle inn", &a), Some("the castle".into()));
        assert_eq!(trim_suffix("samson and lion public house", &a), Some("samson and lion".into()));
        assert_eq!(trim_suffix("the inn", &a), Some("the".into()));
        assert_eq!(trim_suffix("inn", &a), None);
        assert_eq!(trim_suffix("the castle", &a), None);
        Ok(())
    }

    #[test]
    fn bare_affix_does_not_contain() -> Result<(), MatcherError> {
        let (keys, affixes, cache) = (name_keys(), affixes(), PatternCache::new());
        let m = NameMatcher { name_keys: &keys, affixes: &affixes, cache: &cache };
        assert_eq!(m.compare("Church", "St Mary's Church")?, None);
        Ok(())
    }

    #[test]
    fn name_match_by_key() -> Result<(), MatcherError> {
        let (keys, affixes, cache) = (name_keys(), affixes(), PatternCache::new());
        let m = NameMatcher { name_keys: &keys, affixes: &affixes, cache: &cache };

        let osm_tags: BTreeMap<String, String> = [
            ("name", "Welcome Break Gordano Services"),
            ("operator", "Welcome Break"),
            ("name:en", "Gordano Services"),
            ("highway", "services"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let names = vec![ItemName {
            text: "Gordano services".into(),
            sources: vec![NameSource::Label("en".into())],
        }];

        let matches = m.name_match(&osm_tags, &names)?;
        assert_eq!(matches.keys().collect::<Vec<_>>(), vec!["name", "name:en"]);
        assert_eq!(
            matches["name"],
            vec![NameMatch {
                tier: MatchTier::Good,
                literal: "Gordano services".into(),
                sources: vec![NameSource::Label("en".into())],
            }]
        );
        assert_eq!(best_tier(&matches["name:en"]), Some(MatchTier::Good));
        Ok(())
    }
}
