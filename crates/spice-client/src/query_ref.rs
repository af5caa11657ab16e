use crate::{ClientConfig, Error, ExecuteParams, Execution, Parameters, Performance, Scalar};

/// What a caller asks to run or retrieve.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryInput {
    Id(i64),
    /// A numeric id, a query URL or raw SQL.
    Text(String),
    /// An existing execution, whose results are retrieved directly.
    Execution(Execution),
}

impl From<i64> for QueryInput {
    fn from(query_id: i64) -> Self {
        Self::Id(query_id)
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for QueryInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Execution> for QueryInput {
    fn from(execution: Execution) -> Self {
        Self::Execution(execution)
    }
}

/// Classification of textual input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryRef {
    Id(i64),
    Sql(String),
}

impl QueryRef {
    /// Classify text as a query id (bare or within a URL) or raw SQL.
    pub fn classify(text: &str) -> error_stack::Result<Self, Error> {
        let trimmed = text.trim();
        error_stack::ensure!(
            !trimmed.is_empty(),
            Error::InvalidInput("empty query".to_owned())
        );

        if trimmed.bytes().all(|b| b.is_ascii_digit()) || looks_like_url(trimmed) {
            extract_query_id(trimmed).map(Self::Id)
        } else {
            Ok(Self::Sql(text.to_owned()))
        }
    }
}

/// Prefixes (after the scheme) of URLs which identify a query.
///
/// The first is the canonical API URL, the others are the web URLs.
const QUERY_URL_PREFIXES: &[&str] = &[
    "api.dune.com/api/v1/query/",
    "dune.com/queries/",
    "www.dune.com/queries/",
];

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("https://")
        || lower.starts_with("http://")
        || QUERY_URL_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}

/// Extract the query id from a bare id or a query URL.
///
/// Accepts e.g. `4388`, `https://dune.com/queries/4388/8347` and
/// `https://api.dune.com/api/v1/query/4388/results`.
pub fn extract_query_id(text: &str) -> error_stack::Result<i64, Error> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);

    let id = QUERY_URL_PREFIXES
        .iter()
        .find_map(|prefix| without_scheme.strip_prefix(prefix))
        .map(|rest| {
            rest.split(['/', '?', '#'])
                .next()
                .unwrap_or_default()
        })
        .unwrap_or(without_scheme);

    match id.parse::<i64>() {
        Ok(query_id) if query_id > 0 => Ok(query_id),
        _ => Err(error_stack::report!(Error::InvalidQueryReference(
            trimmed.to_owned()
        ))),
    }
}

/// Input resolved to what should be executed or retrieved.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Query {
        query_id: i64,
        /// The caller's parameters, plus the SQL text for raw SQL.
        parameters: Parameters,
        /// Whether the input was raw SQL run through the configured query.
        is_raw_sql: bool,
    },
    /// An existing execution, with no known query.
    Execution(Execution),
}

impl Resolved {
    pub fn query_id(&self) -> Option<i64> {
        match self {
            Self::Query { query_id, .. } => Some(*query_id),
            Self::Execution(_) => None,
        }
    }

    /// Parameters for executing the resolved query, if it is a query.
    pub fn execute_params(&self, performance: Performance) -> Option<ExecuteParams> {
        match self {
            Self::Query {
                query_id,
                parameters,
                ..
            } => Some(ExecuteParams {
                query_id: *query_id,
                parameters: parameters.clone(),
                performance,
            }),
            Self::Execution(_) => None,
        }
    }
}

pub(crate) fn resolve(
    config: &ClientConfig,
    input: QueryInput,
    mut parameters: Parameters,
) -> error_stack::Result<Resolved, Error> {
    let query_ref = match input {
        QueryInput::Execution(execution) => {
            error_stack::ensure!(
                !execution.execution_id.trim().is_empty(),
                Error::InvalidInput("empty execution id".to_owned())
            );
            return Ok(Resolved::Execution(execution));
        }
        QueryInput::Id(query_id) if query_id > 0 => QueryRef::Id(query_id),
        QueryInput::Id(query_id) => {
            error_stack::bail!(Error::InvalidQueryReference(query_id.to_string()))
        }
        QueryInput::Text(text) => QueryRef::classify(&text)?,
    };

    Ok(match query_ref {
        QueryRef::Id(query_id) => Resolved::Query {
            query_id,
            parameters,
            is_raw_sql: false,
        },
        QueryRef::Sql(sql) => {
            parameters.insert(config.raw_sql_parameter.clone(), Scalar::Text(sql));
            Resolved::Query {
                query_id: config.raw_sql_query_id,
                parameters,
                is_raw_sql: true,
            }
        }
    })
}
