use error_stack::{IntoReport, ResultExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// The options available for configuring logging.
#[derive(clap::Args, Debug)]
pub struct TracingOptions {
    /// Log filter configuration.
    ///
    /// Defaults to `spice_=info,warn`, which shows the steps of running a
    /// query (subject to `--verbose`) and only warnings from other crates.
    #[arg(
        long,
        default_value = "spice_=info,warn",
        env = "SPICE_LOG_FILTER",
        hide_env_values = true
    )]
    log_filters: String,
    /// Whether logs should be written as JSON.
    #[arg(long, env = "SPICE_LOG_JSON")]
    log_json: bool,
    /// Disables color output in logs when set to a non-empty value.
    #[arg(long = "log-no-color", env = "NO_COLOR", hide = true)]
    no_color: Option<String>,
}

#[derive(derive_more::Display, Debug)]
pub enum Error {
    #[display(fmt = "invalid log filter '{_0}'")]
    InvalidFilter(String),
    #[display(fmt = "failed to install log subscriber")]
    Install,
}

impl error_stack::Context for Error {}

impl TracingOptions {
    fn ansi(&self) -> bool {
        self.no_color.as_deref().map_or(true, str::is_empty)
    }
}

/// Install logging to stderr, leaving stdout to results.
pub fn setup_tracing(options: &TracingOptions) -> error_stack::Result<(), Error> {
    let filter = EnvFilter::try_new(&options.log_filters)
        .into_report()
        .change_context_lazy(|| Error::InvalidFilter(options.log_filters.clone()))?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_error::ErrorLayer::default());

    // The format layer has a different type with JSON, so each branch
    // installs its own subscriber.
    if options.log_json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr);
        registry
            .with(fmt_layer)
            .try_init()
            .into_report()
            .change_context(Error::Install)
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(options.ansi())
            .with_target(false)
            .with_writer(std::io::stderr);
        registry
            .with(fmt_layer)
            .try_init()
            .into_report()
            .change_context(Error::Install)
    }
}
