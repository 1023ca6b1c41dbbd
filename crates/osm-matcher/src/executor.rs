use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::planet::PlanetTable;
use crate::query::SpatialQuery;

/// One row of candidate search results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow {
    pub table: PlanetTable,

    /// Signed planet row id; see `planet::id_from_table`
    pub row_id: i64,

    pub geometry: Option<String>,

    pub tags: BTreeMap<String, String>,

    /// Metres from the item
    pub distance: f64,
}

/// Something that can run candidate searches against planet data.
///
/// Implementations own their connection and any timeout or retry policy. Each matching
/// worker uses its own executor.
pub trait QueryExecutor {
    fn execute(&mut self, query: &SpatialQuery) -> Result<Vec<QueryRow>, QueryError>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &mut E {
    fn execute(&mut self, query: &SpatialQuery) -> Result<Vec<QueryRow>, QueryError> {
        (**self).execute(query)
    }
}
