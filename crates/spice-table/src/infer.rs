use std::io::Cursor;
use std::sync::Arc;

use arrow_array::{RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use error_stack::{IntoReport, ResultExt};

use crate::{ColumnType, Error};

/// Infer the type of a text column.
///
/// The column is written back out as a single-column CSV and the CSV schema
/// inference is run over it, so the same rules apply as for reading a file.
pub(crate) fn infer_column_type(
    name: &str,
    text: &StringArray,
) -> error_stack::Result<ColumnType, Error> {
    let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Utf8, true)]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(text.clone())])
        .into_report()
        .change_context_lazy(|| Error::InferType(name.to_owned()))?;

    let mut buffer = Vec::new();
    {
        let mut writer = arrow_csv::WriterBuilder::new()
            .has_headers(true)
            .build(&mut buffer);
        writer
            .write(&batch)
            .into_report()
            .change_context_lazy(|| Error::InferType(name.to_owned()))?;
    }

    let (inferred, _) = arrow_csv::reader::Format::default()
        .with_header(true)
        .infer_schema(Cursor::new(buffer), None)
        .into_report()
        .change_context_lazy(|| Error::InferType(name.to_owned()))?;

    let column_type = inferred
        .fields()
        .first()
        .map(|field| ColumnType::from_inferred(field.data_type()))
        .unwrap_or(ColumnType::String);
    tracing::trace!(column = name, %column_type, "inferred column type");
    Ok(column_type)
}
