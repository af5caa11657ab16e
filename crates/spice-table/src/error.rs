#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "failed to read delimited result text")]
    ReadText,
    #[display(fmt = "unknown column type '{_0}'")]
    UnknownColumnType(String),
    #[display(fmt = "no type given for column '{_0}' in strict type mode")]
    MissingColumnType(String),
    #[display(fmt = "type given for column '{_0}' which is not in the result")]
    UnexpectedColumn(String),
    #[display(fmt = "expected {expected} positional types in strict type mode, but got {actual}")]
    PositionalTypeCount { expected: usize, actual: usize },
    #[display(fmt = "failed to infer type of column '{_0}'")]
    InferType(String),
    #[display(fmt = "failed to convert column '{column}' to {column_type}")]
    Convert { column: String, column_type: String },
    #[display(fmt = "invalid timestamp '{_0}'")]
    ParseTimestamp(String),
    #[display(fmt = "page columns '{actual}' do not match result columns '{expected}'")]
    MismatchedPage { expected: String, actual: String },
    #[display(fmt = "failed to assemble table")]
    Assemble,
}

impl error_stack::Context for Error {}

impl Error {
    /// Whether this error describes a mismatch between the requested column
    /// types and the data (or an unusable type name).
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownColumnType(_)
                | Self::MissingColumnType(_)
                | Self::UnexpectedColumn(_)
                | Self::PositionalTypeCount { .. }
        )
    }
}
