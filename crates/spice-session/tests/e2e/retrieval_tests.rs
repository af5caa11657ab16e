//! Tests for shaping and paging of result tables.

use arrow_array::Array;
use arrow_schema::{DataType, TimeUnit};
use itertools::Itertools;
use proptest::prelude::*;
use spice_client::RetrievalParams;
use spice_session::Table;
use spice_table::{ColumnType, ColumnTypes, TypeOverrides};

use crate::{
    block_numbers, session, uncached_options, Endpoint, FakeService, FIRST_BLOCK,
    NUM_NULL_PROJECTS, NUM_ROWS, QUERY_ID,
};

async fn query(service: &FakeService, retrieval: RetrievalParams) -> Table {
    let options = uncached_options().with_retrieval(retrieval);
    session(service).query(QUERY_ID, &options).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_limits_return_prefixes() {
    let service = FakeService::new().with_page_size(250);
    let mut previous: Vec<i64> = Vec::new();
    for limit in [10, 100, 1000] {
        let table = query(&service, RetrievalParams::default().with_limit(limit)).await;
        let blocks = block_numbers(&table);
        assert_eq!(blocks.len(), limit as usize);
        assert_eq!(blocks[0], FIRST_BLOCK);
        assert!(blocks.starts_with(&previous));
        previous = blocks;
    }
}

#[tokio::test(start_paused = true)]
async fn test_paged_result_equals_single_page() {
    let paged = FakeService::new().with_page_size(100);
    let single = FakeService::new();
    let params = RetrievalParams::default().with_limit(550);

    let paged_table = query(&paged, params.clone()).await;
    let single_table = query(&single, params).await;

    assert_eq!(paged_table.num_rows(), 550);
    assert_eq!(paged_table, single_table);
    // 100 rows per page, so 6 requests.
    assert_eq!(paged.count(Endpoint::ExecutionResults), 6);
    assert_eq!(single.count(Endpoint::ExecutionResults), 1);
}

#[tokio::test(start_paused = true)]
async fn test_limit_beyond_rows_stops_at_end() {
    let service = FakeService::new().with_page_size(700);
    let table = query(&service, RetrievalParams::default().with_limit(5000)).await;
    assert_eq!(table.num_rows(), NUM_ROWS);
    assert_eq!(service.count(Endpoint::ExecutionResults), 3);
}

#[tokio::test(start_paused = true)]
async fn test_no_limit_reads_single_response() {
    let service = FakeService::new().with_page_size(300);
    let table = query(&service, RetrievalParams::default()).await;
    assert_eq!(table.num_rows(), 300);
    assert_eq!(service.count(Endpoint::ExecutionResults), 1);
}

#[tokio::test(start_paused = true)]
async fn test_offset() {
    let service = FakeService::new();
    let table = query(
        &service,
        RetrievalParams::default().with_limit(5).with_offset(20),
    )
    .await;
    assert_eq!(
        block_numbers(&table),
        (20..25).map(|i| FIRST_BLOCK + i).collect_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn test_sort_puts_nulls_last() {
    let service = FakeService::new();
    for sort_by in ["project", "project desc"] {
        let table = query(&service, RetrievalParams::default().with_sort_by(sort_by)).await;
        let project = table.column_by_name("project").unwrap();
        let valid = NUM_ROWS - NUM_NULL_PROJECTS;
        assert_eq!(project.null_count(), NUM_NULL_PROJECTS, "{sort_by}");
        assert!(project.is_valid(valid - 1), "{sort_by}");
        assert!(project.is_null(valid), "{sort_by}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_sort_descending() {
    let service = FakeService::new();
    let table = query(
        &service,
        RetrievalParams::default()
            .with_sort_by("block_number desc")
            .with_limit(3),
    )
    .await;
    let last = FIRST_BLOCK + NUM_ROWS as i64 - 1;
    assert_eq!(block_numbers(&table), vec![last, last - 1, last - 2]);
}

#[tokio::test(start_paused = true)]
async fn test_column_selection() {
    let service = FakeService::new();
    let table = query(
        &service,
        RetrievalParams::default()
            .with_columns(["amount", "project"])
            .with_limit(10),
    )
    .await;
    let names = table
        .schema()
        .fields()
        .iter()
        .map(|field| field.name().clone())
        .collect_vec();
    assert_eq!(names, vec!["amount", "project"]);

    let url = &service.urls(Endpoint::ExecutionResults)[0];
    assert_eq!(url.query(), Some("limit=10&columns=amount%2Cproject"));
}

#[tokio::test(start_paused = true)]
async fn test_sample_count() {
    let service = FakeService::new();
    let table = query(&service, RetrievalParams::default().with_sample_count(50)).await;
    assert_eq!(table.num_rows(), 50);
}

#[tokio::test(start_paused = true)]
async fn test_inferred_types() {
    let service = FakeService::new();
    let table = query(&service, RetrievalParams::default().with_limit(20)).await;
    let schema = table.schema();
    let types = schema
        .fields()
        .iter()
        .map(|field| field.data_type().clone())
        .collect_vec();
    assert_eq!(
        types,
        vec![
            DataType::Int64,
            DataType::Utf8,
            DataType::Float64,
            DataType::Utf8
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_type_overrides() {
    let service = FakeService::new();
    let types = TypeOverrides::Partial(ColumnTypes::named([
        ("block_number", ColumnType::UInt64),
        ("block_time", ColumnType::Timestamp),
    ]));
    let table = query(
        &service,
        RetrievalParams::default().with_limit(20).with_types(types),
    )
    .await;
    let schema = table.schema();
    assert_eq!(
        schema.field_with_name("block_number").unwrap().data_type(),
        &DataType::UInt64
    );
    assert_eq!(
        schema.field_with_name("block_time").unwrap().data_type(),
        &DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into()))
    );
    assert_eq!(
        schema.field_with_name("amount").unwrap().data_type(),
        &DataType::Float64
    );
}

#[tokio::test(start_paused = true)]
async fn test_strict_types_reject_missing_columns() {
    let service = FakeService::new();
    let types = TypeOverrides::Strict(ColumnTypes::named([("amount", ColumnType::Float64)]));
    let options = uncached_options().with_retrieval(
        RetrievalParams::default().with_limit(20).with_types(types),
    );
    let err = session(&service)
        .query(QUERY_ID, &options)
        .await
        .unwrap_err();
    let table_error = err.downcast_ref::<spice_table::Error>().unwrap();
    assert_eq!(
        table_error,
        &spice_table::Error::MissingColumnType("block_number".to_owned())
    );
}

/// Types of every column, so separately retrieved slices share a schema.
fn all_types() -> TypeOverrides {
    TypeOverrides::Strict(ColumnTypes::named([
        ("block_number", ColumnType::Int64),
        ("project", ColumnType::String),
        ("amount", ColumnType::Float64),
        ("block_time", ColumnType::Timestamp),
    ]))
}

/// The first `limit` rows, and the same rows retrieved in slices of `slice`.
fn whole_and_sliced(limit: u64, slice: u64) -> (Table, Table) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap();
    runtime.block_on(async {
        let service = FakeService::new().with_page_size(64);
        let retrieval = RetrievalParams::default().with_types(all_types());
        let whole = query(&service, retrieval.clone().with_limit(limit)).await;

        let mut slices = Vec::new();
        for offset in (0..limit).step_by(slice as usize) {
            let params = retrieval
                .clone()
                .with_offset(offset)
                .with_limit(slice.min(limit - offset));
            slices.push(query(&service, params).await);
        }
        let sliced = arrow_select::concat::concat_batches(&whole.schema(), &slices).unwrap();
        (whole, sliced)
    })
}

#[test]
fn test_limit_equals_concatenated_slices() {
    let (whole, sliced) = whole_and_sliced(250, 40);
    assert_eq!(whole.num_rows(), 250);
    assert_eq!(sliced, whole);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_slices_cover_limit(limit in 1u64..300, slice in 1u64..120) {
        let (whole, sliced) = whole_and_sliced(limit, slice);
        prop_assert_eq!(whole.num_rows() as u64, limit);
        prop_assert_eq!(sliced, whole);
    }
}
