#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "failed to resolve query")]
    Resolve,
    #[display(fmt = "failed to determine age of latest execution")]
    Freshness,
    #[display(fmt = "failed to submit execution")]
    Submit,
    #[display(fmt = "failed to wait for execution")]
    Poll,
    #[display(fmt = "failed to retrieve results")]
    Fetch,
    #[display(fmt = "failed to access result cache")]
    Cache,
    #[display(fmt = "no successful execution for query (execution_id={execution_id})")]
    NoResults { execution_id: String },
    #[display(fmt = "could not determine execution of the result")]
    UnknownExecution,
    #[display(fmt = "failed to create async runtime")]
    Runtime,
}

impl error_stack::Context for Error {}

/// The client error underlying a session error, if any.
///
/// This exposes e.g. the verbatim service message of
/// [spice_client::Error::Remote] or the execution id of
/// [spice_client::Error::ExecutionFailed].
pub fn client_error(report: &error_stack::Report<Error>) -> Option<&spice_client::Error> {
    report.downcast_ref::<spice_client::Error>()
}
