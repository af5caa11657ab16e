use std::sync::Arc;
use std::time::Duration;

use error_stack::{IntoReport, ResultExt};
use url::Url;

use crate::backoff::Backoff;
use crate::query_ref::resolve;
use crate::remote::{parse_json, service_error, ServiceError};
use crate::urls::{QueryArgs, ResultFormat, Urls};
use crate::{
    ClientConfig, Error, ExecuteParams, Execution, ExecutionStatus, HttpRequest, HttpResponse,
    Method, Parameters, Performance, QueryInput, Resolved, Transport, Verbosity,
};

const API_KEY_HEADER: &str = "X-Dune-API-Key";
const USER_AGENT_HEADER: &str = "User-Agent";

/// Client for executions of queries and their results.
///
/// Cloning is cheap; clones share the configuration and transport.
#[derive(Clone)]
pub struct ExecutionClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ExecutionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(serde::Serialize)]
struct SubmitRequest<'a> {
    #[serde(skip_serializing_if = "Parameters::is_empty")]
    query_parameters: &'a Parameters,
    performance: Performance,
}

#[derive(serde::Deserialize)]
struct SubmitResponse {
    execution_id: String,
}

impl ExecutionClient {
    pub fn new(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    pub fn with_shared_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn urls(&self) -> Urls<'_> {
        Urls::new(&self.config.base_url)
    }

    /// Resolve input to a query (with effective parameters) or an existing
    /// execution.
    pub fn resolve(
        &self,
        input: QueryInput,
        parameters: Parameters,
    ) -> error_stack::Result<Resolved, Error> {
        resolve(&self.config, input, parameters)
    }

    /// Send a single request.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> error_stack::Result<HttpResponse, Error> {
        tracing::debug!(%method, path = url.path(), "sending request");
        let request = HttpRequest {
            method,
            url,
            headers: vec![
                (
                    API_KEY_HEADER.to_owned(),
                    self.config.api_key.expose().to_owned(),
                ),
                (USER_AGENT_HEADER.to_owned(), self.config.user_agent.clone()),
            ],
            body,
        };
        self.transport
            .request(request)
            .await
            .change_context(Error::Transport)
    }

    /// Send a request, retrying with randomized exponential backoff while
    /// the service answers with HTTP 429.
    pub(crate) async fn send_with_backoff(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
        initial_backoff: Duration,
    ) -> error_stack::Result<HttpResponse, Error> {
        let mut backoff = Backoff::new(initial_backoff);
        loop {
            let response = self.send(method, url.clone(), body.clone()).await?;
            if !response.is_rate_limited() {
                return Ok(response);
            }

            let delay = backoff.next_delay();
            tracing::debug!(%method, path = url.path(), ?delay, "rate limited");
            tokio::time::sleep(delay).await;
        }
    }

    /// The most recent execution of the query with the given parameters.
    ///
    /// Returns `None` if there is no execution, or if the latest execution
    /// has not finished successfully and `allow_unfinished` is false.
    pub async fn latest_execution(
        &self,
        params: &ExecuteParams,
        allow_unfinished: bool,
    ) -> error_stack::Result<Option<Execution>, Error> {
        let mut args = QueryArgs::default();
        args.push("limit", 0);
        args.push_parameters(&params.parameters);
        let url = self
            .urls()
            .query_results(params.query_id, ResultFormat::Json, &args)?;

        let response = self
            .send_with_backoff(Method::Get, url, None, self.config.rate_limit_backoff)
            .await?;
        match service_error(&response) {
            Some(ServiceError::NoExecution) => {
                tracing::debug!(query_id = params.query_id, "no execution of query");
                return Ok(None);
            }
            Some(error) => return Err(error.into_error()),
            None => {}
        }

        let status: ExecutionStatus = parse_json(&response)?;
        let usable = status.is_execution_finished && !status.state.is_failure();
        if !usable && !allow_unfinished {
            tracing::debug!(
                query_id = params.query_id,
                state = ?status.state,
                "latest execution is not usable"
            );
            return Ok(None);
        }

        let execution_id = status
            .execution_id
            .ok_or_else(|| error_stack::report!(Error::UnexpectedResponse(response.status)))
            .attach_printable("missing execution_id")?;
        Ok(Some(Execution {
            execution_id,
            started_at: status.execution_started_at,
        }))
    }

    /// Age of the latest execution of the query, from its start time.
    ///
    /// Returns `None` if there is no execution, or it has not started.
    pub async fn freshness_age(
        &self,
        params: &ExecuteParams,
    ) -> error_stack::Result<Option<Duration>, Error> {
        let Some(execution) = self.latest_execution(params, true).await? else {
            return Ok(None);
        };
        let Some(started_at) = execution.started_at else {
            return Ok(None);
        };
        // A start time in the future (clock skew) counts as brand new.
        let age = (chrono::Utc::now() - started_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Ok(Some(age))
    }

    /// Submit a new execution of a query.
    pub async fn submit(
        &self,
        params: &ExecuteParams,
        verbosity: Verbosity,
    ) -> error_stack::Result<Execution, Error> {
        crate::progress!(
            verbosity,
            query_id = params.query_id,
            parameters = ?params.parameters,
            performance = %params.performance,
            "initiating new execution"
        );

        let url = self.urls().execute(params.query_id)?;
        let body = serde_json::to_string(&SubmitRequest {
            query_parameters: &params.parameters,
            performance: params.performance,
        })
        .into_report()
        .change_context(Error::Encode)?;

        let response = self
            .send_with_backoff(Method::Post, url, Some(body), self.config.rate_limit_backoff)
            .await?;
        let submitted: SubmitResponse = parse_json(&response)?;
        tracing::debug!(execution_id = %submitted.execution_id, "submitted execution");
        Ok(Execution::new(submitted.execution_id))
    }
}
