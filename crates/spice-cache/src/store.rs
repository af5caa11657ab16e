use std::fs::File;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use spice_client::{ExecuteParams, Execution, ExecutionClient, RetrievalParams};
use spice_table::Table;

use crate::{CacheKey, Error};

/// Directory of cached result tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStore {
    dir: PathBuf,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `dune_spice` below the system temporary directory.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("dune_spice")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Look up the cached result of the latest execution of a query.
    ///
    /// Returns the latest (successful) execution along with the table, so
    /// callers need not look it up again on a miss. Both are `None` if the
    /// query has no usable execution.
    pub async fn read(
        &self,
        client: &ExecutionClient,
        execute: &ExecuteParams,
        retrieval: &RetrievalParams,
    ) -> error_stack::Result<(Option<Table>, Option<Execution>), Error> {
        let Some(execution) = client
            .latest_execution(execute, false)
            .await
            .change_context(Error::LatestExecution)?
        else {
            return Ok((None, None));
        };

        let key = match CacheKey::new(&execution, execute, retrieval) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("latest execution cannot be cached: {e:?}");
                return Ok((None, Some(execution)));
            }
        };

        let table = self.load(&key)?;
        if table.is_some() {
            spice_client::progress!(
                retrieval.verbosity,
                "loading result from cache, execution_id = {}",
                execution.execution_id
            );
        } else {
            tracing::debug!(file = key.file_name(), "cache miss");
        }
        Ok((table, Some(execution)))
    }

    /// Store the result of an execution.
    ///
    /// Returns the path of the entry.
    pub fn write(
        &self,
        table: &Table,
        execution: &Execution,
        execute: &ExecuteParams,
        retrieval: &RetrievalParams,
    ) -> error_stack::Result<PathBuf, Error> {
        let key = CacheKey::new(execution, execute, retrieval)?;
        spice_client::progress!(
            retrieval.verbosity,
            "saving result to cache, execution_id = {}",
            execution.execution_id
        );
        self.save(&key, table)
    }

    /// Load the entry for `key`, if it exists.
    pub fn load(&self, key: &CacheKey) -> error_stack::Result<Option<Table>, Error> {
        let path = self.path(key);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .into_report()
                    .change_context(Error::Read(path))
            }
        };

        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .into_report()
            .change_context_lazy(|| Error::Read(path.clone()))?;
        let schema = reader.schema().clone();
        let batches = reader
            .build()
            .into_report()
            .change_context_lazy(|| Error::Read(path.clone()))?
            .collect::<Result<Vec<_>, _>>()
            .into_report()
            .change_context_lazy(|| Error::Read(path.clone()))?;

        let table = arrow_select::concat::concat_batches(&schema, &batches)
            .into_report()
            .change_context_lazy(|| Error::Read(path.clone()))?;
        Ok(Some(table))
    }

    /// Save `table` as the entry for `key`.
    ///
    /// The table is written to a uniquely named temporary file in the cache
    /// directory, which is then renamed into place. Concurrent writers of
    /// the same key each publish a complete file.
    pub fn save(&self, key: &CacheKey, table: &Table) -> error_stack::Result<PathBuf, Error> {
        std::fs::create_dir_all(&self.dir)
            .into_report()
            .change_context_lazy(|| Error::CreateDir(self.dir.clone()))?;

        let path = self.path(key);
        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", key.file_name()))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .into_report()
            .change_context_lazy(|| Error::Write(path.clone()))?;

        let mut writer = ArrowWriter::try_new(temp.as_file(), table.schema(), None)
            .into_report()
            .change_context_lazy(|| Error::Write(path.clone()))?;
        writer
            .write(table)
            .into_report()
            .change_context_lazy(|| Error::Write(path.clone()))?;
        writer
            .close()
            .into_report()
            .change_context_lazy(|| Error::Write(path.clone()))?;

        temp.persist(&path)
            .into_report()
            .change_context_lazy(|| Error::Write(path.clone()))?;
        tracing::debug!(path = %path.display(), rows = table.num_rows(), "saved cache entry");
        Ok(path)
    }
}
