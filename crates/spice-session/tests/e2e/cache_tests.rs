//! Tests for reuse of results through the local cache.

use spice_client::{Parameters, RetrievalParams, Scalar, Verbosity};
use spice_session::{CacheOptions, Table};
use spice_table::{ColumnType, ColumnTypes, TypeOverrides};

use crate::{cached_files, options, session, Endpoint, FakeService, NUM_ROWS, QUERY_ID};

fn assert_same_table(actual: &Table, expected: &Table) {
    assert_eq!(actual.schema().fields(), expected.schema().fields());
    assert_eq!(actual.columns(), expected.columns());
}

#[tokio::test(start_paused = true)]
async fn test_second_query_hits_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    let seeded = service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);
    let options = options(cache_dir.path()).with_retrieval(
        RetrievalParams::default().with_types(TypeOverrides::Partial(ColumnTypes::named([(
            "block_time",
            ColumnType::Timestamp,
        )]))),
    );

    let first = session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.count(Endpoint::ExecutionResults), 1);
    let files = cached_files(cache_dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with(&format!("{QUERY_ID}__{seeded}__")));
    assert!(files[0].ends_with(".parquet"));

    let second = session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.result_requests(), 1);
    assert_eq!(second.num_rows(), NUM_ROWS);
    assert_same_table(&second, &first);
}

#[tokio::test(start_paused = true)]
async fn test_new_execution_is_cached() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    let session = session(&service);
    let options = options(cache_dir.path());

    session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.count(Endpoint::Execute), 1);
    let files = cached_files(cache_dir.path());
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with(&format!("{QUERY_ID}__01HFAKE000001__")));

    session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.result_requests(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_changed_retrieval_misses() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);

    for limit in [10, 20, 10] {
        let options = options(cache_dir.path())
            .with_retrieval(RetrievalParams::default().with_limit(limit));
        let table = session.query(QUERY_ID, &options).await.unwrap();
        assert_eq!(table.num_rows(), limit as usize);
    }

    assert_eq!(service.count(Endpoint::ExecutionResults), 2);
    assert_eq!(cached_files(cache_dir.path()).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_changed_parameters_miss() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    let age = chrono::Duration::hours(1);
    service.seed_execution(QUERY_ID, &[("chain", "ethereum")], age);
    service.seed_execution(QUERY_ID, &[("chain", "polygon")], age);
    let session = session(&service);

    for chain in ["ethereum", "polygon", "ethereum"] {
        let parameters = Parameters::from([("chain".to_owned(), Scalar::from(chain))]);
        let options = options(cache_dir.path()).with_parameters(parameters);
        session.query(QUERY_ID, &options).await.unwrap();
    }

    assert_eq!(service.count(Endpoint::Execute), 0);
    assert_eq!(service.count(Endpoint::ExecutionResults), 2);
    assert_eq!(cached_files(cache_dir.path()).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_verbosity_does_not_miss() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);

    for verbosity in [Verbosity::Quiet, Verbosity::Steps, Verbosity::Results] {
        let options = options(cache_dir.path()).with_verbosity(verbosity);
        session.query(QUERY_ID, &options).await.unwrap();
    }

    assert_eq!(service.result_requests(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_caches_new_execution() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);
    let options = options(cache_dir.path());

    session.query(QUERY_ID, &options).await.unwrap();
    session
        .query(QUERY_ID, &options.clone().with_refresh(true))
        .await
        .unwrap();
    assert_eq!(cached_files(cache_dir.path()).len(), 2);

    // The new execution is now the latest, and its result is cached.
    session.query(QUERY_ID, &options).await.unwrap();
    assert_eq!(service.count(Endpoint::Execute), 1);
    assert_eq!(service.count(Endpoint::ExecutionResults), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_cache() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);
    let options = options(cache_dir.path()).with_cache(CacheOptions {
        dir: cache_dir.path().join("disabled"),
        ..CacheOptions::disabled()
    });

    session.query(QUERY_ID, &options).await.unwrap();
    session.query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.result_requests(), 2);
    assert_eq!(service.count(Endpoint::Latest), 0);
    assert!(!cache_dir.path().join("disabled").exists());
}

#[tokio::test(start_paused = true)]
async fn test_load_without_save() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    let session = session(&service);
    let options = options(cache_dir.path()).with_cache(CacheOptions {
        save: false,
        ..CacheOptions::in_dir(cache_dir.path())
    });

    session.query(QUERY_ID, &options).await.unwrap();
    session.query(QUERY_ID, &options).await.unwrap();

    assert_eq!(service.count(Endpoint::ExecutionResults), 2);
    assert!(cached_files(cache_dir.path()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_save_without_load_keys_by_fetched_execution() {
    let cache_dir = tempfile::tempdir().unwrap();
    let service = FakeService::new();
    let seeded = service.seed_execution(QUERY_ID, &[], chrono::Duration::hours(1));
    // A newer execution finishes while the first results are retrieved.
    service.seed_execution_after_next_results(QUERY_ID);
    let options = options(cache_dir.path()).with_cache(CacheOptions {
        load: false,
        ..CacheOptions::in_dir(cache_dir.path())
    });

    let table = session(&service).query(QUERY_ID, &options).await.unwrap();

    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.executions().len(), 2);
    assert_eq!(service.count(Endpoint::ExecutionResults), 1);
    let files = cached_files(cache_dir.path());
    assert_eq!(files.len(), 1);
    assert!(
        files[0].starts_with(&format!("{QUERY_ID}__{seeded}__")),
        "{files:?}"
    );
}
