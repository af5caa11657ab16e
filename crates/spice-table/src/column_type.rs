use std::str::FromStr;

use arrow_schema::{DataType, TimeUnit};

use crate::Error;

/// The closed set of column types a result table may contain.
///
/// Type names given by users (e.g. on the command line) are looked up in a
/// fixed table rather than interpreted, see [ColumnType::from_str].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Date,
    /// Microsecond precision timestamps in UTC.
    Timestamp,
}

/// Accepted (lower-cased) spellings for each column type.
const TYPE_NAMES: &[(&str, ColumnType)] = &[
    ("string", ColumnType::String),
    ("str", ColumnType::String),
    ("utf8", ColumnType::String),
    ("text", ColumnType::String),
    ("varchar", ColumnType::String),
    ("boolean", ColumnType::Boolean),
    ("bool", ColumnType::Boolean),
    ("int8", ColumnType::Int8),
    ("i8", ColumnType::Int8),
    ("int16", ColumnType::Int16),
    ("i16", ColumnType::Int16),
    ("int32", ColumnType::Int32),
    ("i32", ColumnType::Int32),
    ("int64", ColumnType::Int64),
    ("i64", ColumnType::Int64),
    ("bigint", ColumnType::Int64),
    ("uint8", ColumnType::UInt8),
    ("u8", ColumnType::UInt8),
    ("uint16", ColumnType::UInt16),
    ("u16", ColumnType::UInt16),
    ("uint32", ColumnType::UInt32),
    ("u32", ColumnType::UInt32),
    ("uint64", ColumnType::UInt64),
    ("u64", ColumnType::UInt64),
    ("float32", ColumnType::Float32),
    ("f32", ColumnType::Float32),
    ("float", ColumnType::Float32),
    ("float64", ColumnType::Float64),
    ("f64", ColumnType::Float64),
    ("double", ColumnType::Float64),
    ("date", ColumnType::Date),
    ("datetime", ColumnType::Timestamp),
    ("timestamp", ColumnType::Timestamp),
];

impl ColumnType {
    pub const TIME_ZONE: &'static str = "UTC";

    /// The Arrow type columns of this type are decoded to.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String => DataType::Utf8,
            Self::Boolean => DataType::Boolean,
            Self::Int8 => DataType::Int8,
            Self::Int16 => DataType::Int16,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::UInt8 => DataType::UInt8,
            Self::UInt16 => DataType::UInt16,
            Self::UInt32 => DataType::UInt32,
            Self::UInt64 => DataType::UInt64,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Date => DataType::Date32,
            Self::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some(Self::TIME_ZONE.into())),
        }
    }

    /// Maps a type produced by CSV schema inference to a column type.
    ///
    /// Inference never yields temporal types: text which merely looks like a
    /// date stays text unless a type is requested explicitly.
    pub(crate) fn from_inferred(data_type: &DataType) -> Self {
        match data_type {
            DataType::Boolean => Self::Boolean,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => Self::Int64,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => Self::Float64,
            _ => Self::String,
        }
    }

    /// The canonical name of this type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::UInt8 => "UInt8",
            Self::UInt16 => "UInt16",
            Self::UInt32 => "UInt32",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Date => "Date",
            Self::Timestamp => "Timestamp",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = error_stack::Report<Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        TYPE_NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, column_type)| *column_type)
            .ok_or_else(|| error_stack::report!(Error::UnknownColumnType(s.to_owned())))
    }
}
