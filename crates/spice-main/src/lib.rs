#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod arguments;
mod output;
mod query_command;
pub mod tracing_setup;

pub use output::{output_file_name, OutputFormat};
pub use query_command::QueryCommand;
