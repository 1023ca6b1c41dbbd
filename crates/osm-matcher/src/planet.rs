use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The tag whose presence marks an osm2pgsql way or relation as an area.
pub const AREA_INDICATOR: &str = "way_area";

// -------------------------------------------------------------------------------------------------
// PlanetTable
// -------------------------------------------------------------------------------------------------
/// One of the geometry-kind partitions of an osm2pgsql planet database.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetTable {
    Point,
    Line,
    Polygon,
}

impl PlanetTable {
    pub const ALL: [PlanetTable; 3] = [PlanetTable::Point, PlanetTable::Line, PlanetTable::Polygon];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanetTable::Point => "point",
            PlanetTable::Line => "line",
            PlanetTable::Polygon => "polygon",
        }
    }

    /// The name of this table in a database using `prefix`, e.g., `planet_polygon`.
    pub fn table_name(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.as_str())
    }
}

impl std::fmt::Display for PlanetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanetTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(PlanetTable::Point),
            "line" => Ok(PlanetTable::Line),
            "polygon" => Ok(PlanetTable::Polygon),
            _ => Err(format!("unknown planet table {s:?}")),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// OsmType
// -------------------------------------------------------------------------------------------------
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsmType::Node => "node",
            OsmType::Way => "way",
            OsmType::Relation => "relation",
        }
    }
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// -------------------------------------------------------------------------------------------------
// Mapping
// -------------------------------------------------------------------------------------------------
/// Get the OSM element kind and id for a row of a planet table.
///
/// osm2pgsql stores relations in the line and polygon tables with negated ids, so a negative
/// `row_id` there is a relation. Point rows are always nodes; a negative point id is outside
/// the domain of this function.
pub fn id_from_table(table: PlanetTable, row_id: i64) -> (OsmType, u64) {
    match table {
        PlanetTable::Point => {
            debug_assert!(row_id >= 0, "point rows should have non-negative ids");
            (OsmType::Node, row_id.unsigned_abs())
        }
        PlanetTable::Line | PlanetTable::Polygon if row_id < 0 => {
            (OsmType::Relation, row_id.unsigned_abs())
        }
        PlanetTable::Line | PlanetTable::Polygon => (OsmType::Way, row_id.unsigned_abs()),
    }
}

/// Get the planet table and row id for an OSM element.
///
/// This is the inverse of `id_from_table`. Ways and relations go to the polygon table when
/// `has_area` is set, otherwise to the line table. Returns `None` if `id` does not fit in a
/// signed row id.
pub fn table_from_id(osm_type: OsmType, id: u64, has_area: bool) -> Option<(PlanetTable, i64)> {
    let table = if has_area {
        PlanetTable::Polygon
    } else {
        PlanetTable::Line
    };
    let row_id = i64::try_from(id).ok()?;
    Some(match osm_type {
        OsmType::Node => (PlanetTable::Point, row_id),
        OsmType::Way => (table, row_id),
        OsmType::Relation => (table, -row_id),
    })
}

// -------------------------------------------------------------------------------------------------
// OsmElement
// -------------------------------------------------------------------------------------------------
/// An OSM element as exported for import into a planet snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmElement {
    #[serde(rename = "type")]
    pub osm_type: OsmType,

    pub id: u64,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Representative point of the element
    pub lat: f64,
    pub lon: f64,

    /// Geometry in whatever text form the source provides
    #[serde(default)]
    pub geom: Option<String>,
}

impl OsmElement {
    /// Get the planet table and row id under which this element is stored.
    pub fn planet_table_id(&self) -> Option<(PlanetTable, i64)> {
        let has_area = self.tags.contains_key(AREA_INDICATOR);
        table_from_id(self.osm_type, self.id, has_area)
    }
}
