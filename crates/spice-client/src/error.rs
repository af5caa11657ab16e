#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "invalid input: {_0}")]
    InvalidInput(String),
    #[display(fmt = "invalid query reference '{_0}'")]
    InvalidQueryReference(String),
    #[display(fmt = "missing API key")]
    MissingCredential,
    #[display(fmt = "invalid base URL '{_0}'")]
    InvalidBaseUrl(String),
    /// An error message returned by the service, verbatim.
    #[display(fmt = "{_0}")]
    Remote(String),
    #[display(fmt = "execution failed: execution_id={execution_id}")]
    ExecutionFailed { execution_id: String },
    #[display(fmt = "request to analytics service failed")]
    Transport,
    #[display(fmt = "unexpected response from analytics service (status {_0})")]
    UnexpectedResponse(u16),
    #[display(fmt = "failed to decode result table")]
    Decode,
    #[display(fmt = "failed to encode request")]
    Encode,
}

impl error_stack::Context for Error {}

impl Error {
    /// Whether this error is the result of invalid caller input, rather than
    /// a failure talking to the service.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::InvalidQueryReference(_) | Self::MissingCredential
        )
    }
}
