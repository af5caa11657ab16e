#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

use clap::Parser;
use error_stack::ResultExt;
use spice_main::tracing_setup::{setup_tracing, TracingOptions};
use spice_main::QueryCommand;
use tracing::error;

/// spice extracts query results from the Dune API.
///
/// This will 1. collect query data, 2. print it, and 3. save it to disk.
///
/// Examples:
///   spice 3237025                                  by query id
///   spice https://dune.com/queries/3237025         by query url
///   spice "SELECT COUNT(*) FROM ethereum.blocks"   by raw sql
#[derive(clap::Parser, Debug)]
#[command(name = "spice", rename_all = "kebab-case", version, verbatim_doc_comment)]
pub struct SpiceOptions {
    #[command(flatten)]
    tracing_options: TracingOptions,

    #[command(flatten)]
    query: QueryCommand,

    /// Enables a custom panic handler which logs panics.
    #[arg(long, env = "SPICE_DISABLE_LOG_PANIC_HANDLER", hide = true)]
    disable_log_panic_handler: bool,
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() {
    let options = SpiceOptions::parse();
    if let Err(err) = setup_tracing(&options.tracing_options) {
        eprintln!("{err:?}");
        std::process::exit(2);
    }

    if !options.disable_log_panic_handler {
        std::panic::set_hook(Box::new(logging_panic_hook));
    }

    let exit_code = if let Err(err) = main_body(options).await {
        error!("{:?}", err);
        1
    } else {
        0
    };

    std::process::exit(exit_code);
}

#[derive(derive_more::Display, Debug)]
#[display(fmt = "error running command")]
pub struct Error;

impl error_stack::Context for Error {}

async fn main_body(options: SpiceOptions) -> error_stack::Result<(), Error> {
    options.query.execute().await.change_context(Error)
}

fn logging_panic_hook(panic_info: &std::panic::PanicInfo<'_>) {
    let message = panic_info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<String>()
                .map(|s| s.as_ref())
        });

    match (message, panic_info.location()) {
        (Some(message), Some(location)) => error!("Panic: {} at {}", message, location),
        (Some(message), None) => error!("Panic: {} at unknown location", message),
        (None, Some(location)) => error!("Panic: unknown at {}", location),
        (None, None) => error!("Panic: unknown at unknown location"),
    }
}
