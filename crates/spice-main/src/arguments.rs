//! Parsers for command line values.

use std::time::Duration;

use spice_client::{Performance, Scalar, Verbosity};
use spice_table::ColumnType;

fn split_assignment(value: &str) -> Result<(&str, &str), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}

/// Parse a `KEY=VALUE` query parameter. Values are passed on as text.
pub(crate) fn parse_parameter(value: &str) -> Result<(String, Scalar), String> {
    let (key, value) = split_assignment(value)?;
    Ok((key.to_owned(), Scalar::from(value)))
}

/// Parse a `COLUMN=TYPE` assignment, looking the type up by name.
pub(crate) fn parse_column_type(value: &str) -> Result<(String, ColumnType), String> {
    let (column, type_name) = split_assignment(value)?;
    let column_type = type_name
        .parse::<ColumnType>()
        .map_err(|e| e.current_context().to_string())?;
    Ok((column.to_owned(), column_type))
}

pub(crate) fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("expected a number of seconds, got '{value}'"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration '{value}': {e}"))
}

pub(crate) fn parse_verbosity(value: &str) -> Result<Verbosity, String> {
    value
        .parse::<Verbosity>()
        .map_err(|e| e.current_context().to_string())
}

pub(crate) fn parse_performance(value: &str) -> Result<Performance, String> {
    value
        .parse::<Performance>()
        .map_err(|e| e.current_context().to_string())
}
