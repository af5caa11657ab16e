use error_stack::ResultExt;
use spice_cache::CacheStore;
use spice_client::{
    ClientConfig, ExecuteParams, Execution, ExecutionClient, QueryInput, ReqwestTransport,
    Resolved, ResultSource,
};
use spice_table::Table;

use crate::{Error, QueryOptions, QueryOutput, ResultMode};

/// Runs queries, reusing existing results where possible.
///
/// Cloning is cheap; clones share the underlying client.
#[derive(Clone, Debug)]
pub struct Session {
    client: ExecutionClient,
}

impl Session {
    pub fn new(client: ExecutionClient) -> Self {
        Self { client }
    }

    /// Create a session talking to the public API over HTTP.
    pub fn with_api_key(api_key: impl Into<String>) -> error_stack::Result<Self, Error> {
        let config = ClientConfig::new(api_key).change_context(Error::Resolve)?;
        Ok(Self::new(ExecutionClient::new(
            config,
            ReqwestTransport::new(),
        )))
    }

    pub fn client(&self) -> &ExecutionClient {
        &self.client
    }

    /// Get the result table of a query (or existing execution).
    ///
    /// For a query, the result is taken (in order of preference) from the
    /// cache, from the latest execution, or from a new execution. New
    /// executions are always run if `refresh` is set, or if the latest one is
    /// older than `max_age`.
    pub async fn query(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<Table, Error> {
        let (table, _) = self.run(input.into(), options, false).await?;
        Ok(table)
    }

    /// Get the result table of a query, and the execution it came from.
    pub async fn query_with_execution(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<(Table, Execution), Error> {
        let (table, execution) = self.run(input.into(), options, true).await?;
        let execution = execution.ok_or_else(|| error_stack::report!(Error::UnknownExecution))?;
        Ok((table, execution))
    }

    /// Start a new execution of a query, without waiting for it.
    ///
    /// The start time of the returned execution is unknown. Pass it back to
    /// [Session::query] to wait for and retrieve its result. An existing
    /// execution given as input is returned unchanged.
    pub async fn start(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
    ) -> error_stack::Result<Execution, Error> {
        let resolved = self
            .client
            .resolve(input.into(), options.parameters.clone())
            .change_context(Error::Resolve)?;
        match resolved {
            Resolved::Query {
                query_id,
                parameters,
                ..
            } => {
                let execute = ExecuteParams {
                    query_id,
                    parameters,
                    performance: options.performance,
                };
                self.client
                    .submit(&execute, options.poll.verbosity)
                    .await
                    .change_context(Error::Submit)
            }
            Resolved::Execution(execution) => Ok(execution),
        }
    }

    /// Run a query, producing the output selected by `mode`.
    pub async fn query_as(
        &self,
        input: impl Into<QueryInput>,
        options: &QueryOptions,
        mode: ResultMode,
    ) -> error_stack::Result<QueryOutput, Error> {
        match mode {
            ResultMode::Table => self.query(input, options).await.map(QueryOutput::Table),
            ResultMode::Execution => self.start(input, options).await.map(QueryOutput::Execution),
            ResultMode::TableAndExecution => {
                let (table, execution) = self.query_with_execution(input, options).await?;
                Ok(QueryOutput::TableAndExecution(table, execution))
            }
        }
    }

    /// Produce the result table, and the execution it came from if known.
    ///
    /// The execution is always known if `need_execution` is set or results
    /// are cached.
    async fn run(
        &self,
        input: QueryInput,
        options: &QueryOptions,
        need_execution: bool,
    ) -> error_stack::Result<(Table, Option<Execution>), Error> {
        let resolved = self
            .client
            .resolve(input, options.parameters.clone())
            .change_context(Error::Resolve)?;
        match resolved {
            Resolved::Query {
                query_id,
                parameters,
                ..
            } => {
                let execute = ExecuteParams {
                    query_id,
                    parameters,
                    performance: options.performance,
                };
                self.run_query(&execute, options, need_execution).await
            }
            Resolved::Execution(execution) => {
                let (table, execution) = self.run_execution(execution, options).await?;
                Ok((table, Some(execution)))
            }
        }
    }

    async fn run_query(
        &self,
        execute: &ExecuteParams,
        options: &QueryOptions,
        need_execution: bool,
    ) -> error_stack::Result<(Table, Option<Execution>), Error> {
        let store = options.cache.store();
        if !self.must_refresh(execute, options).await? {
            if let Some(found) = self.reuse(execute, options, need_execution, &store).await? {
                return Ok(found);
            }
        }

        let mut execution = self
            .client
            .submit(execute, options.poll.verbosity)
            .await
            .change_context(Error::Submit)?;
        let table = self.wait_and_fetch(&mut execution, options).await?;
        if options.cache.save {
            store
                .write(&table, &execution, execute, &options.retrieval)
                .change_context(Error::Cache)?;
        }
        Ok((table, Some(execution)))
    }

    async fn must_refresh(
        &self,
        execute: &ExecuteParams,
        options: &QueryOptions,
    ) -> error_stack::Result<bool, Error> {
        if options.refresh {
            return Ok(true);
        }
        let Some(max_age) = options.max_age else {
            return Ok(false);
        };

        let age = self
            .client
            .freshness_age(execute)
            .await
            .change_context(Error::Freshness)?;
        match age {
            Some(age) if age <= max_age => Ok(false),
            Some(age) => {
                spice_client::progress!(
                    options.poll.verbosity,
                    "latest execution is {}s old, older than max age of {}s",
                    age.as_secs(),
                    max_age.as_secs()
                );
                Ok(true)
            }
            None => Ok(true),
        }
    }

    /// Result of the latest execution, from the cache or the service.
    ///
    /// Returns `None` if there is no result to reuse.
    ///
    /// When the execution is needed, it is looked up first and its results
    /// fetched by id.
    async fn reuse(
        &self,
        execute: &ExecuteParams,
        options: &QueryOptions,
        need_execution: bool,
        store: &CacheStore,
    ) -> error_stack::Result<Option<(Table, Option<Execution>)>, Error> {
        let latest = if options.cache.load {
            let (table, execution) = store
                .read(&self.client, execute, &options.retrieval)
                .await
                .change_context(Error::Cache)?;
            if let Some(table) = table {
                return Ok(Some((table, execution)));
            }
            execution
        } else if need_execution || options.cache.save {
            self.client
                .latest_execution(execute, false)
                .await
                .change_context(Error::Fetch)?
        } else {
            None
        };

        let source = match &latest {
            Some(execution) => ResultSource::Execution(execution),
            None => ResultSource::Query(execute),
        };
        let Some(fetched) = self
            .client
            .fetch(source, &options.retrieval, &options.poll)
            .await
            .change_context(Error::Fetch)?
        else {
            return Ok(None);
        };

        let execution = fetched.polled.or(latest);
        if execution.is_none() && need_execution {
            // Finished between the lookup and the fetch, so which execution
            // produced the rows is unknown.
            tracing::debug!(query_id = execute.query_id, "results of unknown execution");
            return Ok(None);
        }
        match &execution {
            Some(execution) if options.cache.save => {
                store
                    .write(&fetched.table, execution, execute, &options.retrieval)
                    .change_context(Error::Cache)?;
            }
            _ => {}
        }
        Ok(Some((fetched.table, execution)))
    }

    /// Result of an existing execution. Results are not cached, since the
    /// query is unknown.
    async fn run_execution(
        &self,
        mut execution: Execution,
        options: &QueryOptions,
    ) -> error_stack::Result<(Table, Execution), Error> {
        let table = self.wait_and_fetch(&mut execution, options).await?;
        Ok((table, execution))
    }

    async fn wait_and_fetch(
        &self,
        execution: &mut Execution,
        options: &QueryOptions,
    ) -> error_stack::Result<Table, Error> {
        self.client
            .poll(execution, &options.poll)
            .await
            .change_context(Error::Poll)?;

        let fetched = self
            .client
            .fetch(
                ResultSource::Execution(execution),
                &options.retrieval,
                &options.poll,
            )
            .await
            .change_context(Error::Fetch)?
            .ok_or_else(|| {
                error_stack::report!(Error::NoResults {
                    execution_id: execution.execution_id.clone(),
                })
            })?;
        Ok(fetched.table)
    }
}
