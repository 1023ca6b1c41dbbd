use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::{debug, debug_span, trace};

use crate::address::address_match;
use crate::bad_match::{bad_building_match, category_conflicts};
use crate::compiled_rules::CompiledRules;
use crate::distance::filter_distant_within;
use crate::error::MatcherError;
use crate::executor::{QueryExecutor, QueryRow};
use crate::item::Item;
use crate::matcher_stats::MatcherStats;
use crate::name_match::{ItemName, NameMatches};
use crate::planet::{id_from_table, OsmType, PlanetTable};
use crate::query::{build_queries, MatcherConfig, QueryKind};

// -------------------------------------------------------------------------------------------------
// Candidate
// -------------------------------------------------------------------------------------------------
/// A planet feature returned by one or both candidate searches.
#[derive(Debug, Clone)]
struct Candidate {
    row: QueryRow,

    /// The searches that returned this feature, in execution order
    found_by: Vec<QueryKind>,
}

// -------------------------------------------------------------------------------------------------
// ItemMatch
// -------------------------------------------------------------------------------------------------
/// Scoring detail kept when matching in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDebug {
    pub found_by: Vec<QueryKind>,

    /// The item's tag predicates this candidate satisfies
    pub satisfied_predicates: Vec<String>,

    /// Category tags of the candidate that disagree with the item
    pub category_conflicts: Vec<String>,

    /// Whether the only satisfied predicates were `building` ones
    pub building_only: bool,
}

/// A candidate that survived scoring, with its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMatch {
    pub osm_type: OsmType,
    pub osm_id: u64,
    pub planet_table: PlanetTable,

    /// Signed planet row id
    pub src_id: i64,

    /// The candidate's `name` tag
    pub name: Option<String>,

    pub tags: BTreeMap<String, String>,

    /// Metres from the item
    pub dist: f64,

    pub geom: Option<String>,

    /// Does the candidate carry the item's identifier in a cross-reference tag?
    pub identifier_match: bool,

    /// `None` when there is no address to compare
    pub address_match: Option<bool>,

    pub name_match: NameMatches,

    /// The item's tag filter keys that the candidate also carries
    pub matching_tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<MatchDebug>,
}

// -------------------------------------------------------------------------------------------------
// Matcher
// -------------------------------------------------------------------------------------------------
/// A `Matcher` finds the planet features that correspond to items.
///
/// If matching items on several threads, use a separate `Matcher` and executor for each
/// thread, sharing one `CompiledRules`.
pub struct Matcher<'a> {
    /// The rules used for scoring
    rules: &'a CompiledRules,

    config: &'a MatcherConfig,

    /// Local statistics for this `Matcher`
    local_stats: MatcherStats,

    /// Global statistics, updated with the local statistics when this `Matcher` is dropped
    global_stats: Option<&'a Mutex<MatcherStats>>,
}

/// This `Drop` implementation updates the `global_stats` with the local stats
impl<'a> Drop for Matcher<'a> {
    fn drop(&mut self) {
        if let Some(global_stats) = self.global_stats {
            let mut global_stats = global_stats
                .lock()
                .expect("global matcher stats lock should not be poisoned");
            global_stats.update(&self.local_stats);
        }
    }
}

impl<'a> Matcher<'a> {
    /// Create a new `Matcher` from the given `CompiledRules`.
    ///
    /// If `global_stats` is provided, it will be updated with the local stats from this `Matcher`
    /// when it is dropped.
    pub fn new(
        rules: &'a CompiledRules,
        config: &'a MatcherConfig,
        global_stats: Option<&'a Mutex<MatcherStats>>,
    ) -> Self {
        Matcher {
            rules,
            config,
            local_stats: MatcherStats::default(),
            global_stats,
        }
    }

    pub fn local_stats(&self) -> &MatcherStats {
        &self.local_stats
    }

    /// Find the features in the planet tables named by `table_prefix` that plausibly represent
    /// `item`.
    ///
    /// The tag-filtered search runs before the unfiltered one; a feature returned by both is
    /// scored once, at the position where it was first seen. Matches are returned in that
    /// order. With `debug`, each match carries a `MatchDebug`; the set of matches is the same.
    pub fn find_item_matches<E: QueryExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        item: &Item,
        table_prefix: &str,
        debug: bool,
    ) -> Result<Vec<ItemMatch>, MatcherError> {
        let _span = debug_span!("find_item_matches", item = item.display_id()).entered();
        self.local_stats.items_seen += 1;

        let location = item
            .coordinate()
            .ok_or_else(|| MatcherError::MissingLocation(item.display_id().to_owned()))?;
        let queries = build_queries(&item.tags, location, table_prefix, self.config)?;

        // -----------------------------------------------------------------------------------------
        // Run the searches, merging duplicate features
        // -----------------------------------------------------------------------------------------
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut seen: HashMap<(PlanetTable, i64), usize> = HashMap::new();
        for query in &queries {
            let rows = executor
                .execute(query)
                .map_err(|source| MatcherError::QueryExecution {
                    label: query.label().to_owned(),
                    source,
                })?;
            self.local_stats.queries_run += 1;
            self.local_stats.rows_seen += rows.len() as u64;
            debug!("{} query returned {} rows", query.label(), rows.len());

            for row in rows {
                trace!("{} row {} {} at {:.1}m", query.label(), row.table, row.row_id, row.distance);
                match seen.entry((row.table, row.row_id)) {
                    Entry::Occupied(e) => {
                        let found_by = &mut candidates[*e.get()].found_by;
                        if !found_by.contains(&query.kind) {
                            found_by.push(query.kind);
                        }
                    }
                    Entry::Vacant(e) => {
                        e.insert(candidates.len());
                        candidates.push(Candidate { row, found_by: vec![query.kind] });
                    }
                }
            }
        }

        // -----------------------------------------------------------------------------------------
        // Score each candidate
        // -----------------------------------------------------------------------------------------
        let rules = self.rules.rules();
        let names = item.names(&rules.sitelink_prefixes);
        let address_texts = item.address_texts(&rules.address_properties);

        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            self.local_stats.candidates_scored += 1;
            match self.score(candidate, item, &names, &address_texts, debug)? {
                Some(m) => matches.push(m),
                None => self.local_stats.candidates_rejected += 1,
            }
        }

        let num_scored = matches.len();
        let matches = filter_distant_within(matches, self.config.max_distance);
        self.local_stats.candidates_rejected += (num_scored - matches.len()) as u64;
        self.local_stats.matches_found += matches.len() as u64;
        debug!("{} matches", matches.len());
        Ok(matches)
    }

    /// Compute the evidence for one candidate, returning `None` if it is rejected.
    fn score(
        &self,
        candidate: Candidate,
        item: &Item,
        names: &[ItemName],
        address_texts: &[String],
        debug: bool,
    ) -> Result<Option<ItemMatch>, MatcherError> {
        let Candidate { row, found_by } = candidate;
        let tags = &row.tags;
        let rules = self.rules.rules();

        let identifier_match = match &item.qid {
            Some(qid) => rules
                .cross_reference_keys
                .iter()
                .any(|k| tags.get(k) == Some(qid)),
            None => false,
        };
        let address_match = address_match(tags, address_texts, self.rules.pattern_cache())?;
        let name_match = self.rules.name_matcher().name_match(tags, names)?;
        let matching_tags = item.tags.matching_tags(tags);
        let satisfied = item.tags.satisfied_predicates(tags);

        // a candidate that disagrees with the item on what it is must be vouched for
        let conflicts = category_conflicts(tags, &item.tags, self.rules);
        if !conflicts.is_empty()
            && !identifier_match
            && !satisfied.iter().any(|p| self.rules.is_category_key(p.key()))
        {
            debug!("Rejecting {} {}: category conflict {:?}", row.table, row.row_id, conflicts);
            return Ok(None);
        }

        let building_only = !identifier_match
            && !satisfied.is_empty()
            && satisfied.iter().all(|p| p.key() == "building");
        if building_only && bad_building_match(tags, &name_match, item, self.rules) {
            debug!("Rejecting {} {}: bad building match", row.table, row.row_id);
            return Ok(None);
        }

        let has_evidence = identifier_match
            || address_match == Some(true)
            || !name_match.is_empty()
            || !satisfied.is_empty();
        if !has_evidence {
            trace!("Rejecting {} {}: no evidence", row.table, row.row_id);
            return Ok(None);
        }

        let debug = debug.then(|| MatchDebug {
            found_by,
            satisfied_predicates: satisfied.iter().map(|p| p.to_string()).collect(),
            category_conflicts: conflicts,
            building_only,
        });

        let (osm_type, osm_id) = id_from_table(row.table, row.row_id);
        Ok(Some(ItemMatch {
            osm_type,
            osm_id,
            planet_table: row.table,
            src_id: row.row_id,
            name: row.tags.get("name").cloned(),
            dist: row.distance,
            geom: row.geometry,
            identifier_match,
            address_match,
            name_match,
            matching_tags,
            tags: row.tags,
            debug,
        }))
    }
}
