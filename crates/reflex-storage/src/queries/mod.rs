//! Per-entity query modules plus shared row-decoding helpers.

pub mod calibration_ops;
pub mod domain_ops;
pub mod gene_ops;
pub mod maintenance;
pub mod outcome_ops;
pub mod pattern_ops;
pub mod prediction_ops;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

use reflex_core::errors::ReflexError;

/// Map a typed decode failure into a rusqlite conversion error so it can
/// surface from inside `query_map` closures.
pub(crate) fn conv_err(e: ReflexError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional RFC 3339 timestamp column.
pub(crate) fn parse_opt_ts(
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    s.as_deref().map(parse_ts).transpose()
}
