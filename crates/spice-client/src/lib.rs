//! Client for the analytics query service.
//!
//! The [ExecutionClient] wraps a [Transport] and implements the three
//! interactions with the service:
//!
//! 1. Resolving what to run ([QueryInput]) and submitting or discovering an
//!    [Execution] of it.
//! 2. Polling an execution until it reaches a terminal state.
//! 3. Retrieving the result table, following continuation cursors.
//!
//! Every request is retried with randomized exponential backoff while the
//! service answers with HTTP 429.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod backoff;
mod client;
mod config;
mod error;
mod execution;
mod params;
mod poller;
mod progress;
mod query_ref;
mod remote;
mod retriever;
mod transport;
mod urls;


pub use backoff::Backoff;
pub use client::ExecutionClient;
pub use config::{ApiKey, ClientConfig, DEFAULT_BASE_URL, DEFAULT_RAW_SQL_QUERY_ID};
pub use error::Error;
pub use execution::{Execution, ExecutionState, ExecutionStatus};
pub use params::{
    ExecuteParams, Parameters, Performance, PollOptions, RetrievalParams, Scalar, Verbosity,
};
pub use query_ref::{extract_query_id, QueryInput, QueryRef, Resolved};
pub use retriever::{Fetched, ResultSource};
pub use transport::{
    HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError,
};
