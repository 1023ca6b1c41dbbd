use anyhow::{bail, Context, Result};
use indoc::{formatdoc, indoc};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, debug_span, trace};

use crate::distance::Coordinate;
use crate::error::QueryError;
use crate::executor::{QueryExecutor, QueryRow};
use crate::planet::{OsmElement, PlanetTable};
use crate::query::{is_valid_prefix, SpatialQuery};

const METRES_PER_DEGREE_LATITUDE: f64 = 111_320.0;

// -------------------------------------------------------------------------------------------------
// PlanetStore
// -------------------------------------------------------------------------------------------------
/// A local snapshot of planet tables, stored in a sqlite database.
///
/// Like an osm2pgsql database, a snapshot holds `<prefix>_point`, `<prefix>_line` and
/// `<prefix>_polygon` tables, and several prefixes may live side by side. Each feature is
/// stored with a representative point, which is what distances are measured to.
///
/// A `PlanetStore` is not `Sync`; concurrent matching should open one store per worker.
pub struct PlanetStore {
    path: PathBuf,
    conn: Connection,
}

impl PlanetStore {
    const CURRENT_SCHEMA_VERSION: u64 = 1;

    /// Create a new snapshot database at `path` if one does not exist, or open the existing one.
    pub fn create_or_open(path: &Path) -> Result<Self> {
        debug!("Attempting to create or open planet snapshot at {}", path.display());

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open planet snapshot at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "wal")?; // https://www.sqlite.org/wal.html
        conn.pragma_update(None, "synchronous", "normal")?; // https://sqlite.org/pragma.html#pragma_synchronous

        let mut store = Self { path: path.to_owned(), conn };
        store.migrate().context("Failed to initialize planet snapshot schema")?;
        Ok(store)
    }

    /// Open an existing snapshot database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("No planet snapshot at {}", path.display());
        }
        Self::create_or_open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn migrate(&mut self) -> Result<()> {
        let _span = debug_span!("PlanetStore::migrate", "{}", self.path.display()).entered();
        let tx = self.conn.transaction()?;
        let user_version: u64 = tx.pragma_query_value(None, "user_version", val_from_row)?;
        if user_version > Self::CURRENT_SCHEMA_VERSION {
            bail!("Unknown schema version {user_version}");
        }
        if user_version == 0 {
            debug!("Initializing snapshot schema version {}", Self::CURRENT_SCHEMA_VERSION);
            tx.execute_batch(indoc! {r#"
                create table if not exists snapshot_prefix (
                    prefix text primary key not null
                ) strict;
            "#})?;
            tx.pragma_update(None, "user_version", Self::CURRENT_SCHEMA_VERSION)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Create the planet tables for `prefix` if they do not already exist.
    fn ensure_tables(tx: &rusqlite::Transaction<'_>, prefix: &str) -> Result<()> {
        for table in PlanetTable::ALL {
            let name = table.table_name(prefix);
            tx.execute_batch(&formatdoc! {r#"
                create table if not exists {name} (
                    id integer primary key,
                    tags text not null,
                    geom text,
                    lat real not null,
                    lon real not null
                );
                create index if not exists {name}_lat_lon on {name} (lat, lon);
            "#})?;
        }
        tx.execute("insert or ignore into snapshot_prefix (prefix) values (?)", [prefix])?;
        Ok(())
    }

    /// Add OSM elements to the planet tables for `prefix`, replacing any earlier copies.
    ///
    /// Each element goes to the table and row id that osm2pgsql would use. Returns the number
    /// of elements imported.
    pub fn import_elements<I>(&mut self, prefix: &str, elements: I) -> Result<u64>
    where
        I: IntoIterator<Item = OsmElement>,
    {
        let _span = debug_span!("PlanetStore::import_elements", prefix).entered();
        if !is_valid_prefix(prefix) {
            bail!("Invalid table prefix {prefix:?}: expected an SQL identifier");
        }

        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        Self::ensure_tables(&tx, prefix)?;

        let mut num_imported = 0;
        for element in elements {
            let Some((table, row_id)) = element.planet_table_id() else {
                bail!(
                    "Cannot import {}/{}: id is too large for a planet table row",
                    element.osm_type,
                    element.id
                );
            };
            let mut stmt = tx.prepare_cached(&format!(
                "insert or replace into {} (id, tags, geom, lat, lon) values (?, ?, ?, ?, ?)",
                table.table_name(prefix)
            ))?;
            let tags = serde_json::to_string(&element.tags)?;
            stmt.execute((row_id, tags, &element.geom, element.lat, element.lon))?;
            num_imported += 1;
        }
        tx.commit()?;

        debug!("Imported {num_imported} elements");
        Ok(num_imported)
    }

    /// List the table prefixes present in this snapshot.
    pub fn prefixes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("select prefix from snapshot_prefix order by prefix")?;
        let prefixes = stmt
            .query_map((), val_from_row)?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(prefixes)
    }

    /// Count the rows of each planet table for `prefix`.
    pub fn table_counts(&self, prefix: &str) -> Result<Vec<(PlanetTable, u64)>> {
        if !is_valid_prefix(prefix) {
            bail!("Invalid table prefix {prefix:?}: expected an SQL identifier");
        }
        PlanetTable::ALL
            .iter()
            .map(|table| {
                let sql = format!("select count(*) from {}", table.table_name(prefix));
                let count: u64 = self.conn.query_row(&sql, (), val_from_row)?;
                Ok((*table, count))
            })
            .collect()
    }

    fn query_table(&self, table: PlanetTable, query: &SpatialQuery) -> Result<Vec<QueryRow>, QueryError> {
        let center = query.location;
        let dlat = query.radius / METRES_PER_DEGREE_LATITUDE;
        let cos_lat = center.lat.to_radians().cos();
        let dlon = if cos_lat > 1e-6 {
            (query.radius / (METRES_PER_DEGREE_LATITUDE * cos_lat)).min(180.0)
        } else {
            180.0
        };

        let table_name = table.table_name(&query.prefix);
        let mut stmt = self.conn.prepare_cached(&formatdoc! {r#"
            select id, tags, geom, lat, lon
            from {table_name}
            where lat between ?1 and ?2 and lon between ?3 and ?4
        "#})?;

        let raw_rows = stmt.query_map(
            (center.lat - dlat, center.lat + dlat, center.lon - dlon, center.lon + dlon),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            },
        )?;

        let mut rows = Vec::new();
        for raw_row in raw_rows {
            let (row_id, tags, geometry, lat, lon) = raw_row?;
            let distance = center.distance_to(&Coordinate::new(lat, lon));
            if distance > query.radius {
                continue;
            }
            let tags: BTreeMap<String, String> =
                serde_json::from_str(&tags).map_err(|e| QueryError::MalformedRow {
                    table: table_name.clone(),
                    message: format!("row {row_id} has invalid tags: {e}"),
                })?;
            if !query.predicates.is_empty() && !query.predicates.iter().any(|p| p.is_satisfied_by(&tags)) {
                continue;
            }
            rows.push(QueryRow { table, row_id, geometry, tags, distance });
        }
        Ok(rows)
    }
}

impl QueryExecutor for PlanetStore {
    fn execute(&mut self, query: &SpatialQuery) -> Result<Vec<QueryRow>, QueryError> {
        let _span = debug_span!("PlanetStore::execute", query = query.label()).entered();
        if !is_valid_prefix(&query.prefix) {
            return Err(QueryError::InvalidTablePrefix(query.prefix.clone()));
        }

        let mut rows = Vec::new();
        for table in PlanetTable::ALL {
            rows.extend(self.query_table(table, query)?);
        }
        rows.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| (a.table, a.row_id).cmp(&(b.table, b.row_id)))
        });
        rows.truncate(query.limit);
        trace!("{} rows within {}m of {}", rows.len(), query.radius, query.location);
        Ok(rows)
    }
}

fn val_from_row<T>(row: &rusqlite::Row<'_>) -> rusqlite::Result<T>
where
    T: rusqlite::types::FromSql,
{
    row.get(0)
}

// -------------------------------------------------------------------------------------------------
// test
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod test {
    use super::*;
    use crate::planet::OsmType;
    use crate::query::{build_queries, MatcherConfig, QueryKind};
    use crate::tag_filter::TagFilter;
    use pretty_assertions::assert_eq;

    fn element(osm_type: OsmType, id: u64, tags: &[(&str, &str)], lat: f64, lon: f64) -> OsmElement {
        OsmElement {
            osm_type,
            id,
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            lat,
            lon,
            geom: None,
        }
    }

    fn reunion_store(dir: &Path) -> Result<PlanetStore> {
        let mut store = PlanetStore::create_or_open(&dir.join("planet.db"))?;
        store.import_elements(
            "planet",
            vec![
                element(OsmType::Node, 600482843, &[("name", "Reunion Tower"), ("tourism", "attraction")], 32.7755, -96.8089),
                element(
                    OsmType::Way,
                    29191381,
                    &[("building", "hotel"), ("addr:street", "Reunion Boulevard"), ("way_area", "1")],
                    32.7752,
                    -96.8094,
                ),
                element(OsmType::Relation, 5, &[("building", "yes")], 32.7760, -96.8100),
                // about 11km north
                element(OsmType::Node, 7, &[("building", "yes")], 32.8755, -96.8089),
            ],
        )?;
        Ok(store)
    }

    #[test]
    fn import_and_count() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = reunion_store(dir.path())?;
        assert_eq!(store.prefixes()?, vec!["planet".to_string()]);
        assert_eq!(
            store.table_counts("planet")?,
            vec![(PlanetTable::Point, 2), (PlanetTable::Line, 1), (PlanetTable::Polygon, 1)]
        );
        Ok(())
    }

    #[test]
    fn reopen_existing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        drop(reunion_store(dir.path())?);
        let store = PlanetStore::open(&dir.path().join("planet.db"))?;
        assert_eq!(store.prefixes()?, vec!["planet".to_string()]);
        assert!(PlanetStore::open(&dir.path().join("missing.db")).is_err());
        Ok(())
    }

    #[test]
    fn narrow_and_broad_queries() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = reunion_store(dir.path())?;
        let filter = TagFilter::new(&["building=hotel"])?;
        let queries = build_queries(
            &filter,
            Coordinate::new(32.7755, -96.8089),
            "planet",
            &MatcherConfig::default(),
        )?;

        assert_eq!(queries[0].kind, QueryKind::Narrow);
        let narrow = store.execute(&queries[0])?;
        assert_eq!(
            narrow.iter().map(|r| (r.table, r.row_id)).collect::<Vec<_>>(),
            vec![(PlanetTable::Polygon, 29191381)]
        );
        assert_eq!(narrow[0].tags["addr:street"], "Reunion Boulevard");

        let broad = store.execute(&queries[1])?;
        assert_eq!(
            broad.iter().map(|r| (r.table, r.row_id)).collect::<Vec<_>>(),
            vec![
                (PlanetTable::Point, 600482843),
                (PlanetTable::Polygon, 29191381),
                (PlanetTable::Line, -5),
            ]
        );
        assert_eq!(broad[0].distance, 0.0);
        assert!(broad.windows(2).all(|w| w[0].distance <= w[1].distance));
        Ok(())
    }

    #[test]
    fn limit_applies() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = reunion_store(dir.path())?;
        let config = MatcherConfig { limit: 1, ..Default::default() };
        let queries =
            build_queries(&TagFilter::default(), Coordinate::new(32.7755, -96.8089), "planet", &config)?;
        assert_eq!(store.execute(&queries[0])?.len(), 1);
        Ok(())
    }

    #[test]
    fn unknown_prefix_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = reunion_store(dir.path())?;
        let queries = build_queries(
            &TagFilter::default(),
            Coordinate::new(32.7755, -96.8089),
            "other",
            &MatcherConfig::default(),
        )?;
        assert!(matches!(store.execute(&queries[0]), Err(QueryError::Sqlite(_))));
        Ok(())
    }

    #[test]
    fn invalid_prefix_on_import() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = PlanetStore::create_or_open(&dir.path().join("planet.db"))?;
        assert!(store.import_elements("drop table", Vec::new()).is_err());
        Ok(())
    }

    #[test]
    fn oversized_id_fails_the_import() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = PlanetStore::create_or_open(&dir.path().join("planet.db"))?;
        let err = store
            .import_elements(
                "planet",
                vec![
                    element(OsmType::Node, 1, &[("amenity", "pub")], 51.5, -0.1),
                    element(OsmType::Way, 18446744073709551615, &[("building", "yes")], 51.5, -0.1),
                ],
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("way/18446744073709551615"), "{err:#}");

        // the whole batch is rolled back
        assert_eq!(store.prefixes()?, Vec::<String>::new());
        Ok(())
    }
}
