use indoc::formatdoc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::distance::Coordinate;
use crate::error::MatcherError;
use crate::item::Item;
use crate::planet::PlanetTable;
use crate::tag_filter::{TagFilter, TagPredicate};

// -------------------------------------------------------------------------------------------------
// MatcherConfig
// -------------------------------------------------------------------------------------------------
/// Tunable parameters of candidate search and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Search radius of the tag-filtered pass, in metres
    pub radius: f64,

    /// Search radius of the unfiltered pass, in metres
    pub broad_radius: f64,

    /// Maximum number of rows returned by each pass
    pub limit: usize,

    /// Candidates further than this, in metres, are dropped
    pub max_distance: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            radius: 1000.0,
            broad_radius: 1000.0,
            limit: 50,
            max_distance: crate::distance::DEFAULT_MAX_DISTANCE,
        }
    }
}

// -------------------------------------------------------------------------------------------------
// SpatialQuery
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Restricted to features satisfying the item's tag filter
    Narrow,

    /// Every nearby feature, to catch candidates tagged differently than expected
    Broad,
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::Narrow => "narrow",
            QueryKind::Broad => "broad",
        }
    }
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A description of one candidate search, independent of how it is executed.
///
/// Rows produced for it are shaped `(planet_table, src_id, geom, tags, dist)` and ordered by
/// distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialQuery {
    pub kind: QueryKind,

    /// Planet table prefix, e.g., `planet` for `planet_point`
    pub prefix: String,

    pub location: Coordinate,

    /// Metres
    pub radius: f64,

    pub limit: usize,

    /// OR-combined; empty for a broad query
    pub predicates: Vec<TagPredicate>,
}

impl SpatialQuery {
    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    /// Render this query as PostGIS SQL against an osm2pgsql planet database.
    pub fn to_sql(&self) -> String {
        let point = format!(
            "ST_Transform(ST_SetSRID(ST_MakePoint({}, {}), 4326), 3857)",
            self.location.lon, self.location.lat
        );
        let tag_condition = if self.predicates.is_empty() {
            String::new()
        } else {
            let alternatives: Vec<String> = self.predicates.iter().map(predicate_sql).collect();
            format!(" and ({})", alternatives.join(" or "))
        };

        let selects: Vec<String> = PlanetTable::ALL
            .iter()
            .map(|table| {
                formatdoc! {"
                    select '{table}' as planet_table, osm_id as src_id, ST_AsGeoJSON(ST_Transform(way, 4326)) as geom, tags, ST_Distance(way, {point}) as dist
                    from {name}
                    where ST_DWithin(way, {point}, {radius}){tag_condition}",
                    table = table.as_str(),
                    name = table.table_name(&self.prefix),
                    radius = self.radius,
                }
            })
            .collect();

        formatdoc! {"
            select * from (
            {union}
            ) a
            order by dist
            limit {limit}",
            union = selects.join("\nunion\n"),
            limit = self.limit,
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn predicate_sql(predicate: &TagPredicate) -> String {
    match predicate {
        TagPredicate::Key(key) => format!("(tags ? {})", quote_literal(key)),
        TagPredicate::KeyValue { key, value } => {
            format!("(tags->{} = {})", quote_literal(key), quote_literal(value))
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Building queries
// -------------------------------------------------------------------------------------------------
/// Is `prefix` usable as the leading part of an SQL table name?
pub fn is_valid_prefix(prefix: &str) -> bool {
    lazy_static! {
        static ref IDENTIFIER: Regex =
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex should compile");
    }
    IDENTIFIER.is_match(prefix)
}

/// Build the candidate searches for an item at `location`: the tag-filtered pass, unless the
/// filter is empty, followed by the unfiltered pass.
pub fn build_queries(
    filter: &TagFilter,
    location: Coordinate,
    prefix: &str,
    config: &MatcherConfig,
) -> Result<Vec<SpatialQuery>, MatcherError> {
    if !is_valid_prefix(prefix) {
        return Err(MatcherError::InvalidTablePrefix(prefix.to_owned()));
    }

    let mut queries = Vec::with_capacity(2);
    if !filter.is_empty() {
        queries.push(SpatialQuery {
            kind: QueryKind::Narrow,
            prefix: prefix.to_owned(),
            location,
            radius: config.radius,
            limit: config.limit,
            predicates: filter.iter().cloned().collect(),
        });
    }
    queries.push(SpatialQuery {
        kind: QueryKind::Broad,
        prefix: prefix.to_owned(),
        location,
        radius: config.broad_radius,
        limit: config.limit,
        predicates: Vec::new(),
    });
    Ok(queries)
}

/// Render the tag-filtered search for an item as SQL, or the unfiltered one if the item has
/// no tag filter.
pub fn item_match_sql(item: &Item, prefix: &str, config: &MatcherConfig) -> Result<String, MatcherError> {
    let location = item
        .coordinate()
        .ok_or_else(|| MatcherError::MissingLocation(item.display_id().to_owned()))?;
    let queries = build_queries(&item.tags, location, prefix, config)?;
    Ok(queries
        .first()
        .map(|q| q.to_sql())
        .unwrap_or_default())
}
