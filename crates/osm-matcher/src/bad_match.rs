use std::collections::BTreeMap;

use crate::compiled_rules::CompiledRules;
use crate::item::Item;
use crate::name_match::{best_tier, MatchTier, NameMatches};
use crate::tag_filter::{TagFilter, TagPredicate};

/// Does a candidate that matched only on a generic `building` predicate look like a false
/// positive?
///
/// A candidate carrying an incompatible category (e.g., `amenity=parking`) that the item does
/// not itself ask for is always bad. Otherwise a `good` name match on any identity key makes it
/// acceptable, while a best of `both_trimmed` on some identity key without such support is bad.
/// Weaker name matches neither condemn nor rescue.
pub fn bad_building_match(
    osm_tags: &BTreeMap<String, String>,
    name_match: &NameMatches,
    item: &Item,
    rules: &CompiledRules,
) -> bool {
    if incompatible_category(osm_tags, &item.tags, rules).is_some() {
        return true;
    }

    let name_keys = &rules.rules().name_keys;
    let best_tiers: Vec<MatchTier> = name_match
        .iter()
        .filter(|(key, _)| name_keys.is_name_key(key))
        .filter_map(|(_, matches)| best_tier(matches))
        .collect();

    if best_tiers.contains(&MatchTier::Good) {
        return false;
    }
    best_tiers.contains(&MatchTier::BothTrimmed)
}

/// Find the first incompatible category that the candidate carries and the item's filter
/// does not ask for.
pub fn incompatible_category<'r>(
    osm_tags: &BTreeMap<String, String>,
    filter: &TagFilter,
    rules: &'r CompiledRules,
) -> Option<&'r TagPredicate> {
    rules
        .incompatible_categories()
        .iter()
        .filter(|p| p.is_satisfied_by(osm_tags))
        .find(|p| !requested_by(p, filter))
}

fn requested_by(predicate: &TagPredicate, filter: &TagFilter) -> bool {
    match predicate {
        TagPredicate::Key(key) => filter.iter().any(|q| q.key() == key),
        TagPredicate::KeyValue { .. } => filter.contains(predicate),
    }
}

/// Find the candidate's category tags that contradict the item's filter.
///
/// For each category key on which the item asks only for specific values, a candidate value
/// outside those values is a conflict. Conflicts are rendered as `key=value`.
pub fn category_conflicts(
    osm_tags: &BTreeMap<String, String>,
    filter: &TagFilter,
    rules: &CompiledRules,
) -> Vec<String> {
    let mut conflicts = Vec::new();
    for (key, osm_value) in osm_tags {
        if !rules.is_category_key(key) || filter.has_bare_key(key) {
            continue;
        }
        let mut wanted = filter.values_for_key(key).peekable();
        if wanted.peek().is_none() {
            continue;
        }
        if !wanted.any(|v| v == osm_value) {
            conflicts.push(format!("{key}={osm_value}"));
        }
    }
    conflicts
}
