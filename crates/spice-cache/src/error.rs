use std::path::PathBuf;

#[derive(derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[display(fmt = "execution '{execution_id}' has no start time and cannot be cached")]
    MissingTimestamp { execution_id: String },
    #[display(fmt = "failed to encode cache key")]
    EncodeKey,
    #[display(fmt = "failed to look up latest execution")]
    LatestExecution,
    #[display(fmt = "failed to create cache directory '{}'", "_0.display()")]
    CreateDir(PathBuf),
    #[display(fmt = "failed to write cache entry '{}'", "_0.display()")]
    Write(PathBuf),
    #[display(fmt = "failed to read cache entry '{}'", "_0.display()")]
    Read(PathBuf),
}

impl error_stack::Context for Error {}
