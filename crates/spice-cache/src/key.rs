use std::collections::BTreeMap;

use error_stack::{IntoReport, ResultExt};
use sha2::{Digest, Sha256};
use spice_client::{ExecuteParams, Execution, Parameters, RetrievalParams, Scalar};
use spice_table::TypeOverrides;

use crate::Error;

/// Part of every key. Changing it invalidates all existing entries.
pub const CACHE_VERSION: &str = "spice-0.2";

/// Number of hex digits of the hash used in file names.
const HASH_LEN: usize = 16;

/// Everything which affects the content of a result table.
///
/// Fields are hashed in declaration order; maps are ordered by key.
/// Verbosity, credentials and the performance tier are not part of it.
#[derive(serde::Serialize)]
struct KeyMaterial<'a> {
    version: &'static str,
    execution_id: &'a str,
    query_id: i64,
    parameters: &'a Parameters,
    limit: Option<u64>,
    offset: Option<u64>,
    sample_count: Option<u64>,
    sort_by: Option<&'a str>,
    columns: Option<&'a [String]>,
    extras: &'a BTreeMap<String, Scalar>,
    types: &'a TypeOverrides,
}

/// Hash of an execution together with the parameters it was retrieved with.
pub fn parameter_hash(
    execution_id: &str,
    execute: &ExecuteParams,
    retrieval: &RetrievalParams,
) -> error_stack::Result<String, Error> {
    let material = KeyMaterial {
        version: CACHE_VERSION,
        execution_id,
        query_id: execute.query_id,
        parameters: &execute.parameters,
        limit: retrieval.limit,
        offset: retrieval.offset,
        sample_count: retrieval.sample_count,
        sort_by: retrieval.sort_by.as_deref(),
        columns: retrieval.columns.as_deref(),
        extras: &retrieval.extras,
        types: &retrieval.types,
    };
    let encoded = serde_json::to_vec(&material)
        .into_report()
        .change_context(Error::EncodeKey)?;

    let digest = Sha256::digest(&encoded);
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    Ok(hash)
}

/// Identity of one cache entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query_id: i64,
    pub execution_id: String,
    pub hash: String,
    /// Start of the execution, in seconds since the epoch.
    pub timestamp: i64,
}

impl CacheKey {
    /// Derive the key of a result.
    ///
    /// Fails with [Error::MissingTimestamp] if the start time of the execution
    /// is not known, so only started executions are cached.
    pub fn new(
        execution: &Execution,
        execute: &ExecuteParams,
        retrieval: &RetrievalParams,
    ) -> error_stack::Result<Self, Error> {
        let started_at = execution.started_at.ok_or_else(|| {
            error_stack::report!(Error::MissingTimestamp {
                execution_id: execution.execution_id.clone(),
            })
        })?;

        Ok(Self {
            query_id: execute.query_id,
            execution_id: execution.execution_id.clone(),
            hash: parameter_hash(&execution.execution_id, execute, retrieval)?,
            timestamp: started_at.timestamp(),
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}__{}__{}__{}.parquet",
            self.query_id, self.execution_id, self.hash, self.timestamp
        )
    }
}
