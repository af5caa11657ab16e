//! Content-addressed cache of result tables.
//!
//! Each entry is one parquet file named after the query, the execution, a
//! hash of the retrieval parameters and the execution's start time. Entries
//! are never modified: a new execution or different parameters produce a
//! different file name, so nothing needs invalidating.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod error;
mod key;
mod store;

pub use error::Error;
pub use key::{parameter_hash, CacheKey, CACHE_VERSION};
pub use store::CacheStore;
