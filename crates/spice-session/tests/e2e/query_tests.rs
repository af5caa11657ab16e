//! Tests for choosing between existing results and new executions.

use std::collections::BTreeMap;
use std::time::Duration;

use spice_client::{Parameters, Performance, Scalar, DEFAULT_RAW_SQL_QUERY_ID};
use spice_session::{client_error, Execution, QueryOutput, ResultMode};

use crate::{
    block_numbers, session, uncached_options, Endpoint, FakeService, FIRST_BLOCK, NUM_ROWS,
    QUERY_ID,
};

fn hours(hours: i64) -> chrono::Duration {
    chrono::Duration::hours(hours)
}

fn chain(name: &str) -> Parameters {
    Parameters::from([("chain".to_owned(), Scalar::from(name))])
}

#[tokio::test(start_paused = true)]
async fn test_executes_query_without_results() {
    let service = FakeService::new();
    let table = session(&service)
        .query(QUERY_ID, &uncached_options())
        .await
        .unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(block_numbers(&table)[0], FIRST_BLOCK);
    let executions = service.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].query_id, QUERY_ID);
    assert_eq!(executions[0].performance, "medium");
}

#[tokio::test(start_paused = true)]
async fn test_reuses_latest_execution() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(1));

    let table = session(&service)
        .query(QUERY_ID, &uncached_options())
        .await
        .unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.count(Endpoint::Execute), 0);
    assert_eq!(service.count(Endpoint::QueryResults), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_executes_again() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(1));

    let options = uncached_options().with_refresh(true);
    session(&service).query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.count(Endpoint::QueryResults), 0);
}

#[tokio::test(start_paused = true)]
async fn test_max_age_refreshes_stale_results() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(2));

    let options = uncached_options().with_max_age(Duration::from_secs(3600));
    session(&service).query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.count(Endpoint::Execute), 1);
}

#[tokio::test(start_paused = true)]
async fn test_max_age_keeps_fresh_results() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(2));

    let options = uncached_options().with_max_age(Duration::from_secs(3 * 3600));
    session(&service).query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.count(Endpoint::Execute), 0);
}

#[tokio::test(start_paused = true)]
async fn test_max_age_without_execution() {
    let service = FakeService::new();
    let options = uncached_options().with_max_age(Duration::from_secs(3600));
    session(&service).query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.count(Endpoint::QueryResults), 0);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_running_execution() {
    let service = FakeService::new();
    service.seed_running_execution(QUERY_ID, 3);

    let table = session(&service)
        .query(QUERY_ID, &uncached_options())
        .await
        .unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.count(Endpoint::Execute), 0);
    assert_eq!(service.count(Endpoint::Status), 3);
    assert_eq!(service.count(Endpoint::QueryResults), 2);
}

#[tokio::test(start_paused = true)]
async fn test_parameters_select_execution() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[("chain", "ethereum")], hours(1));
    let session = session(&service);

    let options = uncached_options().with_parameters(chain("ethereum"));
    session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.count(Endpoint::Execute), 0);

    let options = uncached_options()
        .with_parameters(chain("polygon"))
        .with_performance(Performance::Large);
    session.query(QUERY_ID, &options).await.unwrap();
    let executions = service.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(
        executions[1].parameters,
        BTreeMap::from([("chain".to_owned(), "polygon".to_owned())])
    );
    assert_eq!(executions[1].performance, "large");
}

#[tokio::test(start_paused = true)]
async fn test_raw_sql_runs_as_parameter() {
    let service = FakeService::new();
    session(&service)
        .query("select * from dex.trades", &uncached_options())
        .await
        .unwrap();

    let executions = service.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].query_id, DEFAULT_RAW_SQL_QUERY_ID);
    assert_eq!(
        executions[0].parameters,
        BTreeMap::from([("query".to_owned(), "select * from dex.trades".to_owned())])
    );
}

#[tokio::test(start_paused = true)]
async fn test_query_by_url() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(1));

    session(&service)
        .query("https://dune.com/queries/4388/8586", &uncached_options())
        .await
        .unwrap();

    assert_eq!(service.count(Endpoint::Execute), 0);
    let url = &service.urls(Endpoint::QueryResults)[0];
    assert_eq!(url.path(), "/api/v1/query/4388/results/csv");
}

#[tokio::test(start_paused = true)]
async fn test_start_then_fetch_execution() {
    let service = FakeService::new().with_pending_polls(2);
    let session = session(&service);
    let options = uncached_options();

    let execution = session.start(QUERY_ID, &options).await.unwrap();
    assert_eq!(execution.started_at, None);
    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.count(Endpoint::Status), 0);

    let table = session.query(execution.clone(), &options).await.unwrap();
    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.count(Endpoint::Status), 2);
    let url = &service.urls(Endpoint::ExecutionResults)[0];
    assert_eq!(
        url.path(),
        format!("/api/v1/execution/{}/results/csv", execution.execution_id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_start_returns_given_execution() {
    let service = FakeService::new();
    let execution = Execution::new("01HGIVEN");
    let started = session(&service)
        .start(execution.clone(), &uncached_options())
        .await
        .unwrap();
    assert_eq!(started, execution);
    assert_eq!(service.count(Endpoint::Execute), 0);
}

#[tokio::test(start_paused = true)]
async fn test_query_with_execution_reports_latest() {
    let service = FakeService::new();
    let seeded = service.seed_execution(QUERY_ID, &[], hours(1));

    let (table, execution) = session(&service)
        .query_with_execution(QUERY_ID, &uncached_options())
        .await
        .unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(execution.execution_id, seeded);
    assert!(execution.started_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_query_as_modes() {
    let service = FakeService::new();
    let session = session(&service);
    let options = uncached_options();

    let output = session
        .query_as(QUERY_ID, &options, ResultMode::Execution)
        .await
        .unwrap();
    let execution = match output {
        QueryOutput::Execution(execution) => execution,
        other => panic!("expected an execution, got {other:?}"),
    };

    let output = session
        .query_as(execution.clone(), &options, ResultMode::TableAndExecution)
        .await
        .unwrap();
    assert_eq!(output.table().map(|table| table.num_rows()), Some(NUM_ROWS));
    assert_eq!(
        output.execution().map(|e| &e.execution_id),
        Some(&execution.execution_id)
    );

    let output = session
        .query_as(QUERY_ID, &options, ResultMode::Table)
        .await
        .unwrap();
    assert!(output.execution().is_none());
    assert_eq!(service.count(Endpoint::Execute), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_execution() {
    let service = FakeService::new().with_failing_executions();
    let err = session(&service)
        .query(QUERY_ID, &uncached_options())
        .await
        .unwrap_err();

    assert_eq!(err.current_context(), &spice_session::Error::Poll);
    assert_eq!(
        client_error(&err),
        Some(&spice_client::Error::ExecutionFailed {
            execution_id: "01HFAKE000001".to_owned()
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_recovers_from_rate_limits() {
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], hours(1));
    service.rate_limit_next(3);

    let table = session(&service)
        .query(QUERY_ID, &uncached_options())
        .await
        .unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.rate_limited(), 3);
    assert_eq!(service.count(Endpoint::QueryResults), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_query_is_invalid() {
    let service = FakeService::new();
    let err = session(&service)
        .query("  ", &uncached_options())
        .await
        .unwrap_err();

    assert_eq!(err.current_context(), &spice_session::Error::Resolve);
    assert!(client_error(&err).unwrap().is_invalid_input());
    assert_eq!(service.count(Endpoint::Execute), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_execution_reports_service_message() {
    let service = FakeService::new();
    let err = session(&service)
        .query(Execution::new("01HMISSING"), &uncached_options())
        .await
        .unwrap_err();

    assert_eq!(
        client_error(&err),
        Some(&spice_client::Error::Remote("not found: execution".to_owned()))
    );
}
