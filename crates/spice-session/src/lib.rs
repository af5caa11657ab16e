//! Running queries against the analytics service.
//!
//! A [Session] decides, for each request, whether an existing result can be
//! reused (from the local cache or the latest execution), or whether a new
//! execution must be submitted and waited for. [BlockingSession] offers the
//! same operations for callers without an async runtime.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod blocking;
mod error;
mod options;
mod session;

pub use blocking::BlockingSession;
pub use error::{client_error, Error};
pub use options::{CacheOptions, QueryOptions, QueryOutput, ResultMode};
pub use session::Session;

pub use spice_client::{Execution, QueryInput};
pub use spice_table::Table;
