use spice_session::{BlockingSession, ResultMode};

use crate::{client, options, uncached_options, Endpoint, FakeService, NUM_ROWS, QUERY_ID};

#[test]
fn test_blocking_query() {
    let service = FakeService::new();
    let session = BlockingSession::with_client(client(&service)).unwrap();

    let table = session.query(QUERY_ID, &uncached_options()).unwrap();
    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.count(Endpoint::Execute), 1);
}

#[test]
fn test_blocking_start_then_query() {
    let service = FakeService::new().with_pending_polls(1);
    let session = BlockingSession::with_client(client(&service)).unwrap();
    let options = uncached_options();

    let execution = session.start(QUERY_ID, &options).unwrap();
    let (table, polled) = session
        .query_with_execution(execution.clone(), &options)
        .unwrap();
    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(polled.execution_id, execution.execution_id);
    assert!(polled.started_at.is_some());
}

#[test]
fn test_blocking_cached_query() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::minutes(5));
    let session = BlockingSession::with_client(client(&service)).unwrap();
    let options = options(cache_dir.path());

    let first = session
        .query_as(QUERY_ID, &options, ResultMode::TableAndExecution)
        .unwrap();
    let second = session
        .query_as(QUERY_ID, &options, ResultMode::TableAndExecution)
        .unwrap();

    assert_eq!(first.execution(), second.execution());
    assert_eq!(service.result_requests(), 1);
}
