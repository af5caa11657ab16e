use arrow_array::{StringArray, TimestampMicrosecondArray};
use chrono::NaiveDateTime;
use error_stack::{IntoReport, ResultExt};

use crate::{ColumnType, Error};

/// Format of timestamps in result text, e.g. `2024-01-31 12:00:00.000 UTC`.
///
/// The fractional seconds are optional. The trailing zone is matched
/// separately, since only UTC is produced by the service.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const UTC_ZONES: &[&str] = &["UTC", "Z", "GMT", "+00:00"];

/// Parse a text column into microsecond timestamps in UTC.
pub(crate) fn parse_timestamps(
    text: &StringArray,
) -> error_stack::Result<TimestampMicrosecondArray, Error> {
    let values = text
        .iter()
        .map(|value| value.map(parse_timestamp).transpose())
        .collect::<error_stack::Result<Vec<_>, Error>>()?;
    Ok(TimestampMicrosecondArray::from(values).with_timezone(ColumnType::TIME_ZONE))
}

fn parse_timestamp(value: &str) -> error_stack::Result<i64, Error> {
    let (datetime, zone) = value
        .trim()
        .rsplit_once(' ')
        .ok_or_else(|| error_stack::report!(Error::ParseTimestamp(value.to_owned())))
        .attach_printable("missing time zone")?;
    if !UTC_ZONES.contains(&zone) {
        return Err(error_stack::report!(Error::ParseTimestamp(value.to_owned())))
            .attach_printable_lazy(|| format!("unsupported time zone '{zone}'"));
    }

    let naive = NaiveDateTime::parse_from_str(datetime, TIMESTAMP_FORMAT)
        .into_report()
        .change_context_lazy(|| Error::ParseTimestamp(value.to_owned()))?;
    Ok(naive.and_utc().timestamp_micros())
}
