use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use spice_table::TypeOverrides;

use crate::Error;

/// A query parameter (or extra service flag) value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Query parameters by name.
///
/// Ordered, so that requests and cache keys do not depend on insertion order.
pub type Parameters = BTreeMap<String, Scalar>;

/// Performance tier an execution is submitted with.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Performance {
    #[default]
    #[display(fmt = "medium")]
    Medium,
    #[display(fmt = "large")]
    Large,
}

impl FromStr for Performance {
    type Err = error_stack::Report<Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(error_stack::report!(Error::InvalidInput(format!(
                "unknown performance tier '{s}'"
            )))),
        }
    }
}

/// Everything needed to submit an execution of a query.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecuteParams {
    pub query_id: i64,
    pub parameters: Parameters,
    /// Defaults to [Performance::Medium].
    pub performance: Performance,
}

impl ExecuteParams {
    pub fn new(query_id: i64) -> Self {
        Self {
            query_id,
            parameters: Parameters::new(),
            performance: Performance::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_performance(mut self, performance: Performance) -> Self {
        self.performance = performance;
        self
    }
}

/// How much progress is reported.
///
/// Lifecycle steps are logged at `info` with [Verbosity::Steps] and at
/// `debug` otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Verbosity {
    Quiet,
    /// Only report results (e.g. files written), not lifecycle steps.
    Results,
    #[default]
    Steps,
}

impl Verbosity {
    pub fn shows_steps(&self) -> bool {
        *self >= Self::Steps
    }

    pub fn shows_results(&self) -> bool {
        *self >= Self::Results
    }
}

impl FromStr for Verbosity {
    type Err = error_stack::Report<Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "quiet" => Ok(Self::Quiet),
            "1" | "results" => Ok(Self::Results),
            "2" | "steps" => Ok(Self::Steps),
            _ => Err(error_stack::report!(Error::InvalidInput(format!(
                "unknown verbosity '{s}'"
            )))),
        }
    }
}

/// Options for polling an execution to completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollOptions {
    /// Time between status requests. Also the initial backoff when a status
    /// request is rate limited. Defaults to 1 second.
    pub poll_interval: Duration,
    pub verbosity: Verbosity,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            verbosity: Verbosity::default(),
        }
    }
}

/// Options controlling the shape of a retrieved result table.
///
/// All options except `verbosity` change the result, and so are part of the
/// cache key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetrievalParams {
    /// Maximum number of rows. Results are paginated until this many rows
    /// have been retrieved. Defaults to all rows of the first page.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
    /// Retrieve a uniform sample of this many rows.
    pub sample_count: Option<u64>,
    /// Sort expression, e.g. `volume desc`.
    pub sort_by: Option<String>,
    /// Only retrieve these columns.
    pub columns: Option<Vec<String>>,
    /// Additional service flags, sent as `extras.<name>`.
    pub extras: BTreeMap<String, Scalar>,
    /// Column types. Defaults to inferring every column.
    pub types: TypeOverrides,
    pub verbosity: Verbosity,
}

impl RetrievalParams {
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_sample_count(mut self, sample_count: u64) -> Self {
        self.sample_count = Some(sample_count);
        self
    }

    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.extras.insert(name.into(), value.into());
        self
    }

    pub fn with_types(mut self, types: TypeOverrides) -> Self {
        self.types = types;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}
