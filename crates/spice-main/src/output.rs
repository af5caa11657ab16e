use std::io::Write;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use parquet::arrow::ArrowWriter;
use spice_client::Execution;
use spice_session::Table;

/// File format of saved results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, derive_more::Display)]
pub enum OutputFormat {
    #[default]
    #[display(fmt = "parquet")]
    Parquet,
    #[display(fmt = "csv")]
    Csv,
    #[display(fmt = "json")]
    Json,
    #[display(fmt = "ndjson")]
    Ndjson,
}

#[derive(derive_more::Display, Debug)]
pub enum Error {
    #[display(fmt = "only one of --csv, --json and --ndjson may be given")]
    MultipleFormats,
    #[display(fmt = "start time of execution '{_0}' is unknown")]
    MissingTimestamp(String),
    #[display(fmt = "failed to encode results as {_0}")]
    Encode(OutputFormat),
    #[display(fmt = "failed to write results to '{}'", "_0.display()")]
    Write(PathBuf),
}

impl error_stack::Context for Error {}

impl OutputFormat {
    const ALL: [Self; 4] = [Self::Parquet, Self::Csv, Self::Json, Self::Ndjson];

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }

    /// Choose the format from the flags given, or else from the extension of
    /// the output file. Defaults to parquet.
    pub fn select(
        csv: bool,
        json: bool,
        ndjson: bool,
        output_file: Option<&Path>,
    ) -> error_stack::Result<Self, Error> {
        let flagged: Vec<Self> = [(csv, Self::Csv), (json, Self::Json), (ndjson, Self::Ndjson)]
            .into_iter()
            .filter_map(|(set, format)| set.then_some(format))
            .collect();
        match flagged.as_slice() {
            [] => {}
            [format] => return Ok(*format),
            _ => error_stack::bail!(Error::MultipleFormats),
        }

        let extension = output_file
            .and_then(|path| path.extension())
            .and_then(|extension| extension.to_str());
        Ok(Self::ALL
            .into_iter()
            .find(|format| Some(format.extension()) == extension)
            .unwrap_or_default())
    }

    /// Encode `table` into `writer`.
    pub fn write(&self, table: &Table, writer: impl Write + Send) -> error_stack::Result<(), Error> {
        let encode = || Error::Encode(*self);
        match self {
            Self::Parquet => {
                let mut writer = ArrowWriter::try_new(writer, table.schema(), None)
                    .into_report()
                    .change_context_lazy(encode)?;
                writer.write(table).into_report().change_context_lazy(encode)?;
                writer.close().into_report().change_context_lazy(encode)?;
            }
            Self::Csv => {
                let mut writer = arrow_csv::Writer::new(writer);
                writer.write(table).into_report().change_context_lazy(encode)?;
            }
            Self::Json => {
                let mut writer = arrow_json::ArrayWriter::new(writer);
                writer.write(table).into_report().change_context_lazy(encode)?;
                writer.finish().into_report().change_context_lazy(encode)?;
            }
            Self::Ndjson => {
                let mut writer = arrow_json::LineDelimitedWriter::new(writer);
                writer.write(table).into_report().change_context_lazy(encode)?;
                writer.finish().into_report().change_context_lazy(encode)?;
            }
        }
        Ok(())
    }
}

/// Name of the file results of `execution` are saved to.
///
/// `dune__{query_name}__[{label}__]{execution_id}__{start time}.{extension}`,
/// with the start time in UTC.
pub fn output_file_name(
    query_name: &str,
    label: Option<&str>,
    execution: &Execution,
    format: OutputFormat,
) -> error_stack::Result<String, Error> {
    let started_at = execution
        .started_at
        .ok_or_else(|| Error::MissingTimestamp(execution.execution_id.clone()))?;
    let label = label.map(|label| format!("{label}__")).unwrap_or_default();
    Ok(format!(
        "dune__{query_name}__{label}{}__{}.{}",
        execution.execution_id,
        started_at.format("%Y-%m-%d--%H-%M-%S"),
        format.extension()
    ))
}

/// Save `table` to `path`, through a temporary file in the same directory.
pub(crate) fn save(
    table: &Table,
    format: OutputFormat,
    path: &Path,
) -> error_stack::Result<(), Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .into_report()
        .change_context_lazy(|| Error::Write(path.to_owned()))?;

    let temp = tempfile::Builder::new()
        .prefix(".spice.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .into_report()
        .change_context_lazy(|| Error::Write(path.to_owned()))?;
    format.write(table, temp.as_file())?;
    temp.persist(path)
        .into_report()
        .change_context_lazy(|| Error::Write(path.to_owned()))?;
    Ok(())
}
