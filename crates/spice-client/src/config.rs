use error_stack::{IntoReport, ResultExt};
use url::Url;

use crate::Error;

/// Base URL of the public API.
pub const DEFAULT_BASE_URL: &str = "https://api.dune.com/api/v1";

/// Query used to run raw SQL. The SQL is passed as a parameter.
pub const DEFAULT_RAW_SQL_QUERY_ID: i64 = 3435121;

const DEFAULT_RAW_SQL_PARAMETER: &str = "query";

/// Credential sent with every request.
///
/// The `Debug` representation never includes the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> error_stack::Result<Self, Error> {
        let key = key.into().trim().to_owned();
        error_stack::ensure!(!key.is_empty(), Error::MissingCredential);
        Ok(Self(key))
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Configuration of an [crate::ExecutionClient].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Sent as the `X-Dune-API-Key` header.
    pub api_key: ApiKey,
    /// Root of all API paths. Defaults to [DEFAULT_BASE_URL].
    pub base_url: Url,
    /// Query id used to execute raw SQL. Defaults to [DEFAULT_RAW_SQL_QUERY_ID].
    pub raw_sql_query_id: i64,
    /// Name of the parameter carrying raw SQL text. Defaults to `query`.
    pub raw_sql_parameter: String,
    /// Sent as the `User-Agent` header. Defaults to `spice/<version>`.
    pub user_agent: String,
    /// Initial delay when a request (other than a status poll) is rate
    /// limited. Defaults to 1 second.
    pub rate_limit_backoff: std::time::Duration,
}

impl ClientConfig {
    /// Create a configuration with default settings for the given key.
    ///
    /// Fails with [Error::MissingCredential] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> error_stack::Result<Self, Error> {
        Ok(Self {
            api_key: ApiKey::new(api_key)?,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            raw_sql_query_id: DEFAULT_RAW_SQL_QUERY_ID,
            raw_sql_parameter: DEFAULT_RAW_SQL_PARAMETER.to_owned(),
            user_agent: format!("spice/{}", env!("CARGO_PKG_VERSION")),
            rate_limit_backoff: std::time::Duration::from_secs(1),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> error_stack::Result<Self, Error> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_raw_sql_query(mut self, query_id: i64, parameter: impl Into<String>) -> Self {
        self.raw_sql_query_id = query_id;
        self.raw_sql_parameter = parameter.into();
        self
    }

    pub fn with_rate_limit_backoff(mut self, backoff: std::time::Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }
}

fn parse_base_url(base_url: &str) -> error_stack::Result<Url, Error> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .into_report()
        .change_context_lazy(|| Error::InvalidBaseUrl(base_url.to_owned()))?;
    error_stack::ensure!(
        !url.cannot_be_a_base(),
        Error::InvalidBaseUrl(base_url.to_owned())
    );
    Ok(url)
}
