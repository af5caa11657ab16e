#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod fixture;
pub(crate) use fixture::*;

mod blocking_tests;
mod cache_tests;
mod query_tests;
mod retrieval_tests;
