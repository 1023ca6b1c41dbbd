use std::collections::BTreeMap;

use crate::error::MatcherError;
use crate::name_match::normalize;
use crate::pattern_cache::PatternCache;

/// Compare a candidate's address tags with the item's address texts.
///
/// Returns `None` when there is nothing to compare: the item has no address text, or the
/// candidate has no `addr:street`. Otherwise the address matches when the house number and
/// street occur together in some text, or when both the street and the postcode occur.
pub fn address_match(
    osm_tags: &BTreeMap<String, String>,
    address_texts: &[String],
    cache: &PatternCache,
) -> Result<Option<bool>, MatcherError> {
    if address_texts.is_empty() {
        return Ok(None);
    }
    let street = match osm_tags.get("addr:street").map(|s| normalize(s)) {
        Some(street) if !street.is_empty() => street,
        _ => return Ok(None),
    };

    let texts: Vec<String> = address_texts.iter().map(|t| normalize(t)).collect();
    let found = |needle: &str| -> Result<bool, MatcherError> {
        for text in &texts {
            if cache.contains_word(text, needle)? {
                return Ok(true);
            }
        }
        Ok(false)
    };

    if let Some(housenumber) = osm_tags.get("addr:housenumber").map(|s| normalize(s)) {
        if !housenumber.is_empty() && found(&format!("{housenumber} {street}"))? {
            return Ok(Some(true));
        }
    }

    if let Some(postcode) = osm_tags.get("addr:postcode").map(|s| normalize(s)) {
        if !postcode.is_empty() && found(&street)? && found(&postcode)? {
            return Ok(Some(true));
        }
    }

    Ok(Some(false))
}
