use error_stack::{IntoReport, ResultExt};
use spice_client::{Execution, ExecutionClient, QueryInput};
use spice_table::Table;
use tokio::runtime::Runtime;

use crate::{Error, QueryOptions, QueryOutput, ResultMode, Session};

/// A [Session] for callers without an async runtime.
///
/// Each call blocks the current thread until the operation completes. Must
/// not be used from within an async context.
#[derive(Debug)]
pub struct BlockingSession {
    session: Session,
    runtime: Runtime,
}

impl BlockingSession {
    pub fn new(session: Session) -> error_stack::Result<Self, Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .into_report()
            .change_context(Error::Runtime)?;
        Ok(Self { session, runtime })
    }

    pub fn with_client(client: ExecutionClient) -> error_stack::Result<Self, Error> {
        Self::new(Session::new(client))
    }

    pub fn with_api_key(api_key: impl Into<String>) -> error_stack::Result<Self, Error> {
        Self::new(Session::with_api_key(api_key)?)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// See [Session::query].
    pub fn query(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<Table, Error> {
        self.runtime.block_on(self.session.query(input, options))
    }

    /// See [Session::query_with_execution].
    pub fn query_with_execution(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<(Table, Execution), Error> {
        self.runtime
            .block_on(self.session.query_with_execution(input, options))
    }

    /// See [Session::start].
    pub fn start(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<Execution, Error> {
        self.runtime.block_on(self.session.start(input, options))
    }

    /// See [Session::query_as].
    pub fn query_as(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
        mode: ResultMode,
    ) -> error_stack::Result<QueryOutput, Error> {
        self.runtime
            .block_on(self.session.query_as(input, options, mode))
    }
}
