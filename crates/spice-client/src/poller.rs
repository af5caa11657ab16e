use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::remote::parse_json;
use crate::{Error, Execution, ExecutionClient, ExecutionStatus, Method, PollOptions};

/// State of polling one execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollState {
    Pending,
    RateLimited,
    DoneOk(Option<DateTime<Utc>>),
    DoneFailed,
}

impl PollState {
    fn from_status(status: &ExecutionStatus) -> Self {
        if !status.is_execution_finished {
            Self::Pending
        } else if status.state.is_failure() {
            Self::DoneFailed
        } else {
            Self::DoneOk(status.execution_started_at)
        }
    }
}

impl ExecutionClient {
    /// Poll an execution until it finishes.
    ///
    /// On success the start time of `execution` is filled in. Fails with
    /// [Error::ExecutionFailed] if the execution finished without a result.
    ///
    /// There is no limit on the time spent polling. Callers needing one
    /// should wrap this in a timeout.
    pub async fn poll(
        &self,
        execution: &mut Execution,
        options: &PollOptions,
    ) -> error_stack::Result<(), Error> {
        let url = self.urls().status(&execution.execution_id)?;
        let start = Instant::now();
        let mut backoff = Backoff::new(options.poll_interval);

        loop {
            let tick = Instant::now();
            crate::progress!(
                options.verbosity,
                execution_id = %execution.execution_id,
                elapsed = ?start.elapsed(),
                "polling results"
            );

            let response = self.send(Method::Get, url.clone(), None).await?;
            let state = if response.is_rate_limited() {
                PollState::RateLimited
            } else {
                PollState::from_status(&parse_json(&response)?)
            };
            tracing::trace!(execution_id = %execution.execution_id, ?state, "polled");

            match state {
                PollState::Pending => {
                    if let Some(remaining) = options.poll_interval.checked_sub(tick.elapsed()) {
                        tokio::time::sleep(remaining).await;
                    }
                }
                PollState::RateLimited => {
                    let delay = backoff.next_delay();
                    tracing::debug!(execution_id = %execution.execution_id, ?delay, "rate limited");
                    tokio::time::sleep(delay).await;
                }
                PollState::DoneFailed => {
                    error_stack::bail!(Error::ExecutionFailed {
                        execution_id: execution.execution_id.clone(),
                    })
                }
                PollState::DoneOk(started_at) => {
                    if started_at.is_some() {
                        execution.started_at = started_at;
                    }
                    tracing::debug!(
                        execution_id = %execution.execution_id,
                        elapsed = ?start.elapsed(),
                        "execution finished"
                    );
                    return Ok(());
                }
            }
        }
    }
}
