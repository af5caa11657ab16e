//! Decoding of raw result text into typed tables.
//!
//! The analytics service returns results as comma-delimited text. Every
//! column is first read as text (with `<nil>` as the null token), then each
//! column is given a type: either from an explicit override, or by
//! re-serializing the column and letting the CSV schema inference pick one.
//!
//! Timestamps and booleans are special-cased since the service's encodings
//! for them are not what the generic casts expect.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod column_type;
mod decode;
mod error;
mod infer;
mod overrides;
mod timestamp;

pub use column_type::ColumnType;
pub use decode::{decode, RawTable, NULL_TOKEN};
pub use error::Error;
pub use overrides::{ColumnTypes, TypeOverrides};
pub use timestamp::TIMESTAMP_FORMAT;

/// The unit of data returned to callers and persisted to the cache.
pub type Table = arrow_array::RecordBatch;
