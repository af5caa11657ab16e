use std::path::PathBuf;
use std::time::Duration;

use spice_cache::CacheStore;
use spice_client::{Execution, Parameters, Performance, PollOptions, RetrievalParams, Verbosity};
use spice_table::Table;

/// Whether and where results are cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheOptions {
    /// Look for a cached result before retrieving one. Defaults to true.
    pub load: bool,
    /// Cache retrieved results. Defaults to true.
    pub save: bool,
    /// Defaults to [CacheStore::default_dir].
    pub dir: PathBuf,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            load: true,
            save: true,
            dir: CacheStore::default_dir(),
        }
    }
}

impl CacheOptions {
    pub fn disabled() -> Self {
        Self {
            load: false,
            save: false,
            ..Self::default()
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub(crate) fn store(&self) -> CacheStore {
        CacheStore::new(self.dir.clone())
    }
}

/// Options of a query.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Always run a new execution, even if a result exists. Defaults to false.
    pub refresh: bool,
    /// Run a new execution if the latest one started longer ago than this.
    pub max_age: Option<Duration>,
    /// Query parameters.
    pub parameters: Parameters,
    /// Performance tier of new executions.
    pub performance: Performance,
    pub poll: PollOptions,
    pub retrieval: RetrievalParams,
    pub cache: CacheOptions,
}

impl QueryOptions {
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_performance(mut self, performance: Performance) -> Self {
        self.performance = performance;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll.poll_interval = poll_interval;
        self
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalParams) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_cache(mut self, cache: CacheOptions) -> Self {
        self.cache = cache;
        self
    }

    /// Set the verbosity of polling and retrieval.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.poll.verbosity = verbosity;
        self.retrieval.verbosity = verbosity;
        self
    }
}

/// What a query should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultMode {
    /// Wait for the result table.
    Table,
    /// Only start an execution, without waiting for it.
    Execution,
    /// Wait for the result table, and report the execution it came from.
    TableAndExecution,
}

/// The output of a query, matching the requested [ResultMode].
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    Table(Table),
    Execution(Execution),
    TableAndExecution(Table, Execution),
}

impl QueryOutput {
    pub fn table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) | Self::TableAndExecution(table, _) => Some(table),
            Self::Execution(_) => None,
        }
    }

    pub fn execution(&self) -> Option<&Execution> {
        match self {
            Self::Execution(execution) | Self::TableAndExecution(_, execution) => Some(execution),
            Self::Table(_) => None,
        }
    }
}
