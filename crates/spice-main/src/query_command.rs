use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use error_stack::{IntoReport, ResultExt};
use spice_client::{
    ClientConfig, ExecutionClient, Parameters, Performance, PollOptions, QueryRef,
    ReqwestTransport, RetrievalParams, Scalar, Verbosity,
};
use spice_session::{CacheOptions, QueryOptions, Session, Table};
use spice_table::{ColumnType, ColumnTypes, TypeOverrides};

use crate::arguments::{
    parse_column_type, parse_parameter, parse_performance, parse_seconds, parse_verbosity,
};
use crate::output::{output_file_name, save, OutputFormat};

/// Collect the result of a query, print it, and save it to disk.
///
/// QUERY is a query id, a query URL or raw SQL.
#[derive(clap::Args, Debug)]
#[command(rename_all = "kebab-case")]
pub struct QueryCommand {
    /// Query id, query URL or raw SQL.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Query parameters.
    #[arg(short, long = "parameters", value_name = "KEY=VALUE", num_args = 1.., value_parser = parse_parameter, help_heading = "Execution")]
    pub parameters: Vec<(String, Scalar)>,
    /// Run a new execution even if results exist.
    #[arg(short, long, help_heading = "Execution")]
    pub refresh: bool,
    /// Run a new execution if the latest one is older than this.
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds, help_heading = "Execution")]
    pub max_age: Option<Duration>,
    /// API key for the service.
    #[arg(long, env = "DUNE_API_KEY", hide_env_values = true, help_heading = "Execution")]
    pub api_key: Option<String>,
    /// Performance tier of new executions: medium or large.
    #[arg(long, default_value = "medium", value_parser = parse_performance, help_heading = "Execution")]
    pub performance: Performance,
    /// Seconds between status requests while waiting for an execution.
    #[arg(long, value_name = "SECONDS", default_value = "1", value_parser = parse_seconds, help_heading = "Execution")]
    pub poll_interval: Duration,
    /// Base URL of the API.
    #[arg(long, env = "DUNE_API_BASE_URL", hide = true)]
    pub base_url: Option<String>,

    /// Number of rows to retrieve.
    #[arg(short, long, value_name = "N_ROWS", help_heading = "Retrieval")]
    pub limit: Option<u64>,
    /// Row to start retrieving from.
    #[arg(long, value_name = "START_ROW", help_heading = "Retrieval")]
    pub offset: Option<u64>,
    /// ORDER BY clause to sort rows by.
    #[arg(short, long, value_name = "ORDER_BY_CLAUSE", help_heading = "Retrieval")]
    pub sort_by: Option<String>,
    /// Columns to retrieve. Defaults to all.
    #[arg(short, long, value_name = "COLUMN", num_args = 1.., help_heading = "Retrieval")]
    pub columns: Option<Vec<String>>,
    /// Types of some columns. Other column types are inferred.
    #[arg(short, long, value_name = "COLUMN=TYPE", num_args = 1.., value_parser = parse_column_type, conflicts_with = "all_types", help_heading = "Retrieval")]
    pub types: Vec<(String, ColumnType)>,
    /// Types of all columns.
    #[arg(long, value_name = "COLUMN=TYPE", num_args = 1.., value_parser = parse_column_type, help_heading = "Retrieval")]
    pub all_types: Vec<(String, ColumnType)>,
    /// Number of random rows to retrieve.
    #[arg(long, value_name = "COUNT", help_heading = "Retrieval")]
    pub sample_count: Option<u64>,
    /// Additional retrieval arguments.
    #[arg(long, value_name = "KEY=VALUE", num_args = 1.., value_parser = parse_parameter, hide = true)]
    pub extras: Vec<(String, Scalar)>,

    /// Neither load nor save cached results.
    #[arg(long, help_heading = "Cache")]
    pub no_cache: bool,
    /// Do not load cached results.
    #[arg(long, help_heading = "Cache")]
    pub no_cache_load: bool,
    /// Do not save results to the cache.
    #[arg(long, help_heading = "Cache")]
    pub no_cache_save: bool,
    /// Cache directory.
    #[arg(long, value_name = "DIR_PATH", env = "SPICE_CACHE_DIR", help_heading = "Cache")]
    pub cache_dir: Option<PathBuf>,

    /// 0 = nothing, 1 = results, 2 = steps.
    #[arg(short, long, value_name = "LEVEL", default_value = "2", value_parser = parse_verbosity, help_heading = "Output")]
    pub verbose: Verbosity,
    /// Do not save results to disk.
    #[arg(long, help_heading = "Output")]
    pub no_save: bool,
    /// Save as CSV instead of parquet.
    #[arg(long, help_heading = "Output")]
    pub csv: bool,
    /// Save as JSON instead of parquet.
    #[arg(long, help_heading = "Output")]
    pub json: bool,
    /// Save as newline delimited JSON instead of parquet.
    #[arg(long, help_heading = "Output")]
    pub ndjson: bool,
    /// Output directory. Defaults to the working directory.
    #[arg(short = 'd', long, value_name = "DIR_PATH", help_heading = "Output")]
    pub output_dir: Option<PathBuf>,
    /// Output file path.
    #[arg(short = 'f', long, value_name = "FILE_PATH", help_heading = "Output")]
    pub output_file: Option<PathBuf>,
    /// Query name to use in the file name.
    #[arg(long, value_name = "NAME", help_heading = "Output")]
    pub query_name: Option<String>,
    /// Label to add to the file name.
    #[arg(long, value_name = "LABEL", help_heading = "Output")]
    pub label: Option<String>,
    /// Write the result to stdout in the output format, and nothing else.
    #[arg(long, help_heading = "Output")]
    pub pipe: bool,
}

#[derive(derive_more::Display, Debug)]
pub enum Error {
    #[display(fmt = "invalid options")]
    InvalidOptions,
    #[display(fmt = "failed to run query")]
    Query,
    #[display(fmt = "failed to output results")]
    Output,
}

impl error_stack::Context for Error {}

impl QueryCommand {
    pub async fn execute(self) -> error_stack::Result<(), Error> {
        let verbosity = if self.pipe {
            Verbosity::Quiet
        } else {
            self.verbose
        };
        let format = OutputFormat::select(
            self.csv,
            self.json,
            self.ndjson,
            self.output_file.as_deref(),
        )
        .change_context(Error::InvalidOptions)?;

        let session = self.session()?;
        let options = self.query_options(verbosity);
        let (table, execution) = session
            .query_with_execution(self.query.as_str(), &options)
            .await
            .change_context(Error::Query)?;

        if self.pipe {
            let encoded = encode(&table, format)?;
            std::io::stdout()
                .lock()
                .write_all(&encoded)
                .into_report()
                .change_context(Error::Output)?;
        } else if verbosity.shows_results() {
            print_results(&table, self.no_save.then_some(format), verbosity)?;
        }

        if !self.no_save {
            let path = match &self.output_file {
                Some(path) => path.clone(),
                None => {
                    let query_name = self.query_name()?;
                    let name =
                        output_file_name(&query_name, self.label.as_deref(), &execution, format)
                            .change_context(Error::Output)?;
                    self.output_dir.clone().unwrap_or_default().join(name)
                }
            };
            spice_client::progress!(verbosity, path = %path.display(), "saving results");
            save(&table, format, &path).change_context(Error::Output)?;
        }
        Ok(())
    }

    fn session(&self) -> error_stack::Result<Session, Error> {
        let api_key = self.api_key.clone().unwrap_or_default();
        let mut config = ClientConfig::new(api_key).change_context(Error::InvalidOptions)?;
        if let Some(base_url) = &self.base_url {
            config = config
                .with_base_url(base_url)
                .change_context(Error::InvalidOptions)?;
        }
        Ok(Session::new(ExecutionClient::new(
            config,
            ReqwestTransport::new(),
        )))
    }

    fn query_options(&self, verbosity: Verbosity) -> QueryOptions {
        let mut retrieval = RetrievalParams {
            limit: self.limit,
            offset: self.offset,
            sample_count: self.sample_count,
            sort_by: self.sort_by.clone(),
            columns: self.columns.clone(),
            extras: self.extras.iter().cloned().collect(),
            types: TypeOverrides::Inferred,
            verbosity,
        };
        if !self.all_types.is_empty() {
            retrieval.types =
                TypeOverrides::Strict(ColumnTypes::named(self.all_types.iter().cloned()));
        } else if !self.types.is_empty() {
            retrieval.types =
                TypeOverrides::Partial(ColumnTypes::named(self.types.iter().cloned()));
        }

        let mut cache = match &self.cache_dir {
            Some(dir) => CacheOptions::in_dir(dir),
            None => CacheOptions::default(),
        };
        cache.load = !(self.no_cache || self.no_cache_load);
        cache.save = !(self.no_cache || self.no_cache_save);

        QueryOptions {
            refresh: self.refresh,
            max_age: self.max_age,
            parameters: self.parameters.iter().cloned().collect::<Parameters>(),
            performance: self.performance,
            poll: PollOptions {
                poll_interval: self.poll_interval,
                verbosity,
            },
            retrieval,
            cache,
        }
    }

    /// The query name used in output file names: the query id, or `RAW_SQL`.
    fn query_name(&self) -> error_stack::Result<String, Error> {
        if let Some(name) = &self.query_name {
            return Ok(name.clone());
        }
        match QueryRef::classify(&self.query).change_context(Error::InvalidOptions)? {
            QueryRef::Id(query_id) => Ok(query_id.to_string()),
            QueryRef::Sql(_) => Ok("RAW_SQL".to_owned()),
        }
    }
}

/// Print the result table, or its encoding in `format` if given and not
/// parquet.
#[allow(clippy::print_stdout)]
fn print_results(
    table: &Table,
    format: Option<OutputFormat>,
    verbosity: Verbosity,
) -> error_stack::Result<(), Error> {
    if verbosity.shows_steps() {
        println!("\nresults:");
    }
    match format {
        Some(format) if format != OutputFormat::Parquet => {
            let encoded = encode(table, format)?;
            println!("{}", String::from_utf8_lossy(&encoded).trim_end());
        }
        _ => {
            let pretty = arrow::util::pretty::pretty_format_batches(std::slice::from_ref(table))
                .into_report()
                .change_context(Error::Output)?;
            println!("{pretty}");
        }
    }
    Ok(())
}

fn encode(table: &Table, format: OutputFormat) -> error_stack::Result<Vec<u8>, Error> {
    let mut buffer = Vec::new();
    format
        .write(table, &mut buffer)
        .change_context(Error::Output)?;
    Ok(buffer)
}
