use error_stack::ResultExt;
use spice_table::{RawTable, Table};
use tokio::time::Instant;
use url::Url;

use crate::remote::{check_response, service_error, ServiceError};
use crate::urls::{QueryArgs, ResultFormat, NEXT_OFFSET_HEADER, NEXT_URI_HEADER};
use crate::{
    Error, ExecuteParams, Execution, ExecutionClient, Method, PollOptions, RetrievalParams,
};

/// Where results are retrieved from.
#[derive(Clone, Copy, Debug)]
pub enum ResultSource<'a> {
    /// The latest execution of a query with the given parameters.
    Query(&'a ExecuteParams),
    Execution(&'a Execution),
}

impl std::fmt::Display for ResultSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(params) => write!(f, "query_id = {}", params.query_id),
            Self::Execution(execution) => write!(f, "execution_id = {}", execution.execution_id),
        }
    }
}

/// A retrieved result table.
#[derive(Clone, Debug)]
pub struct Fetched {
    pub table: Table,
    /// The execution waited for, if the results were requested before it
    /// finished.
    pub polled: Option<Execution>,
}

impl ExecutionClient {
    /// Retrieve the result table of a query or an execution.
    ///
    /// Returns `None` if the query has no execution. If the execution is
    /// still running it is polled to completion and the request repeated.
    ///
    /// With a `limit`, continuation pages are followed until at least that
    /// many rows have been retrieved, and the table is truncated to it.
    pub async fn fetch(
        &self,
        source: ResultSource<'_>,
        params: &RetrievalParams,
        poll: &PollOptions,
    ) -> error_stack::Result<Option<Fetched>, Error> {
        let url = self.results_url(source, params)?;
        crate::progress!(params.verbosity, "getting results, {source}");

        let mut known = match source {
            ResultSource::Query(_) => None,
            ResultSource::Execution(execution) => Some(execution.clone()),
        };
        let mut polled = None;

        // Each repetition follows a complete poll of the execution.
        let first = loop {
            let response = self
                .send_with_backoff(Method::Get, url.clone(), None, poll.poll_interval)
                .await?;
            let message = match service_error(&response) {
                None => {
                    check_response(&response)?;
                    break response;
                }
                Some(ServiceError::NoExecution) => {
                    crate::progress!(params.verbosity, "no existing execution, {source}");
                    return Ok(None);
                }
                Some(ServiceError::StillRunning(message)) => message,
                Some(error) => return Err(error.into_error()),
            };

            tracing::debug!(%message, "results requested before execution finished");
            let mut execution = match (known.take(), source) {
                (Some(execution), _) => execution,
                (None, ResultSource::Execution(execution)) => execution.clone(),
                (None, ResultSource::Query(execute)) => {
                    match self.latest_execution(execute, true).await? {
                        Some(execution) => execution,
                        None => return Ok(None),
                    }
                }
            };
            let polling = Instant::now();
            self.poll(&mut execution, poll).await?;
            // The execution may report finished before its results are
            // served, so repeated requests are at least an interval apart.
            if let Some(remaining) = poll.poll_interval.checked_sub(polling.elapsed()) {
                tokio::time::sleep(remaining).await;
            }
            known = Some(execution.clone());
            polled = Some(execution);
        };

        let mut raw = RawTable::parse(&first.body).change_context(Error::Decode)?;
        if let Some(limit) = params.limit {
            let limit = usize::try_from(limit).unwrap_or(usize::MAX);
            let mut response = first;
            while raw.num_rows() < limit {
                let Some(next) = response.header(NEXT_URI_HEADER) else {
                    break;
                };
                let next = self.urls().continuation(next)?;
                crate::progress!(
                    params.verbosity,
                    "gathering additional page, offset = {}",
                    response.header(NEXT_OFFSET_HEADER).unwrap_or("unknown")
                );

                response = self
                    .send_with_backoff(Method::Get, next, None, poll.poll_interval)
                    .await?;
                check_response(&response)?;
                let page = RawTable::parse(&response.body).change_context(Error::Decode)?;
                if page.num_rows() == 0 {
                    break;
                }
                raw.append(page).change_context(Error::Decode)?;
            }
            raw.truncate(limit);
        }

        let table = raw.decode(&params.types).change_context(Error::Decode)?;
        tracing::debug!(rows = table.num_rows(), columns = table.num_columns(), "retrieved results");
        Ok(Some(Fetched { table, polled }))
    }

    fn results_url(
        &self,
        source: ResultSource<'_>,
        params: &RetrievalParams,
    ) -> error_stack::Result<Url, Error> {
        let mut args = QueryArgs::for_retrieval(params);
        match source {
            ResultSource::Query(execute) => {
                args.push_parameters(&execute.parameters);
                self.urls()
                    .query_results(execute.query_id, ResultFormat::Csv, &args)
            }
            ResultSource::Execution(execution) => self
                .urls()
                .execution_results(&execution.execution_id, &args),
        }
    }
}
