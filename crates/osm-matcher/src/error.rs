// -------------------------------------------------------------------------------------------------
// QueryError
// -------------------------------------------------------------------------------------------------
/// An error from a `QueryExecutor`.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed row from {table}: {message}")]
    MalformedRow { table: String, message: String },

    #[error("invalid table prefix {0:?}")]
    InvalidTablePrefix(String),

    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

// -------------------------------------------------------------------------------------------------
// MatcherError
// -------------------------------------------------------------------------------------------------
/// An error that aborts matching for one item.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// The data source was unreachable or rejected the query.
    /// This is not retried; the caller decides what to do.
    #[error("{label} query failed")]
    QueryExecution {
        label: String,
        #[source]
        source: QueryError,
    },

    /// A name or address literal could not be compiled into a whole-word pattern.
    #[error("failed to compile pattern for {literal:?}")]
    PatternCompilation {
        literal: String,
        #[source]
        source: regex::Error,
    },

    #[error("item {0} has no known location")]
    MissingLocation(String),

    #[error("invalid table prefix {0:?}: expected an SQL identifier")]
    InvalidTablePrefix(String),

    #[error("invalid rule: {0}")]
    InvalidRule(String),
}
