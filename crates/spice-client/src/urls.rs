use error_stack::{IntoReport, ResultExt};
use itertools::Itertools;
use url::Url;

use crate::{Error, Parameters, RetrievalParams};

/// Response header carrying the URL of the next page of results.
pub(crate) const NEXT_URI_HEADER: &str = "x-dune-next-uri";
/// Response header carrying the row offset of the next page of results.
pub(crate) const NEXT_OFFSET_HEADER: &str = "x-dune-next-offset";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResultFormat {
    /// Delimited result text.
    Csv,
    /// Execution metadata (and rows) as JSON.
    Json,
}

/// Query-string arguments, in the order they are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct QueryArgs(Vec<(String, String)>);

impl QueryArgs {
    /// Arguments shaping a result table.
    pub fn for_retrieval(params: &RetrievalParams) -> Self {
        let mut args = Self::default();
        if let Some(limit) = params.limit {
            args.push("limit", limit);
        }
        if let Some(offset) = params.offset {
            args.push("offset", offset);
        }
        if let Some(sample_count) = params.sample_count {
            args.push("sample_count", sample_count);
        }
        if let Some(sort_by) = &params.sort_by {
            args.push("sort_by", sort_by);
        }
        if let Some(columns) = &params.columns {
            args.push("columns", columns.iter().join(","));
        }
        args.push_nested("extras", &params.extras);
        args
    }

    pub fn push(&mut self, key: &str, value: impl std::fmt::Display) {
        self.0.push((key.to_owned(), value.to_string()));
    }

    /// Push a mapping, flattened to `<prefix>.<key>` arguments.
    pub fn push_nested(&mut self, prefix: &str, values: &Parameters) {
        for (key, value) in values {
            self.push(&format!("{prefix}.{key}"), value);
        }
    }

    /// Push query parameters, which the results endpoints accept as
    /// `params.<name>`.
    pub fn push_parameters(&mut self, parameters: &Parameters) {
        self.push_nested("params", parameters);
    }

    fn apply(&self, url: &mut Url) {
        if !self.0.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.0);
        }
    }
}

/// Builds the URLs of the service endpoints below a base URL.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Urls<'a> {
    base: &'a Url,
}

impl<'a> Urls<'a> {
    pub fn new(base: &'a Url) -> Self {
        Self { base }
    }

    fn endpoint(&self, path: &str, args: &QueryArgs) -> error_stack::Result<Url, Error> {
        let base = self.base.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))
            .into_report()
            .change_context_lazy(|| Error::InvalidBaseUrl(base.to_owned()))
            .attach_printable_lazy(|| format!("endpoint '{path}'"))?;
        args.apply(&mut url);
        Ok(url)
    }

    pub fn execute(&self, query_id: i64) -> error_stack::Result<Url, Error> {
        self.endpoint(&format!("query/{query_id}/execute"), &QueryArgs::default())
    }

    pub fn status(&self, execution_id: &str) -> error_stack::Result<Url, Error> {
        self.endpoint(
            &format!("execution/{execution_id}/status"),
            &QueryArgs::default(),
        )
    }

    pub fn query_results(
        &self,
        query_id: i64,
        format: ResultFormat,
        args: &QueryArgs,
    ) -> error_stack::Result<Url, Error> {
        let path = match format {
            ResultFormat::Csv => format!("query/{query_id}/results/csv"),
            ResultFormat::Json => format!("query/{query_id}/results"),
        };
        self.endpoint(&path, args)
    }

    pub fn execution_results(
        &self,
        execution_id: &str,
        args: &QueryArgs,
    ) -> error_stack::Result<Url, Error> {
        self.endpoint(&format!("execution/{execution_id}/results/csv"), args)
    }

    /// Resolve a continuation cursor, which may be absolute or relative to
    /// the base URL.
    pub fn continuation(&self, next: &str) -> error_stack::Result<Url, Error> {
        let parsed = match Url::parse(next) {
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = format!("{}/", self.base.as_str().trim_end_matches('/'));
                Url::parse(&base).and_then(|base| base.join(next))
            }
            parsed => parsed,
        };
        parsed
            .into_report()
            .change_context(Error::UnexpectedResponse(200))
            .attach_printable_lazy(|| format!("invalid continuation '{next}'"))
    }
}
