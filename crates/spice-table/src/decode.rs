use std::sync::Arc;

use arrow_array::{Array, ArrayRef, BooleanArray, RecordBatch, RecordBatchOptions, StringArray};
use arrow_cast::{cast_with_options, CastOptions};
use arrow_schema::{Field, Schema};
use error_stack::{IntoReport, ResultExt};
use itertools::Itertools;

use crate::infer::infer_column_type;
use crate::timestamp::parse_timestamps;
use crate::{ColumnType, Error, Table, TypeOverrides};

/// The token the service uses for null values.
pub const NULL_TOKEN: &str = "<nil>";

/// Decode delimited result text into a typed table.
///
/// Column order always follows the header of `raw`, regardless of the order
/// of any named overrides.
pub fn decode(raw: &str, overrides: &TypeOverrides) -> error_stack::Result<Table, Error> {
    RawTable::parse(raw)?.decode(overrides)
}

/// Result text read as untyped (text) columns.
///
/// Pages of a result are parsed and appended as text, so the column types
/// are resolved once over all rows rather than page by page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTable {
    names: Vec<String>,
    columns: Vec<Vec<Option<String>>>,
    num_rows: usize,
}

impl RawTable {
    /// Read every column of `raw` as text.
    ///
    /// Rows with more fields than the header are truncated, and rows with
    /// fewer fields are padded with nulls. Empty fields and [NULL_TOKEN] are
    /// null.
    pub fn parse(raw: &str) -> error_stack::Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw.as_bytes());

        let names = reader
            .headers()
            .into_report()
            .change_context(Error::ReadText)?
            .iter()
            .map(str::to_owned)
            .collect_vec();

        let mut columns = vec![Vec::new(); names.len()];
        let mut num_rows = 0;
        for record in reader.records() {
            let record = record
                .into_report()
                .change_context(Error::ReadText)
                .attach_printable_lazy(|| format!("row {num_rows}"))?;
            for (index, column) in columns.iter_mut().enumerate() {
                let value = record
                    .get(index)
                    .filter(|value| !value.is_empty() && *value != NULL_TOKEN)
                    .map(str::to_owned);
                column.push(value);
            }
            num_rows += 1;
        }

        Ok(Self {
            names,
            columns,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Append the rows of a following page.
    ///
    /// An empty page (no header) is ignored. Otherwise the page must have
    /// the same header.
    pub fn append(&mut self, page: RawTable) -> error_stack::Result<(), Error> {
        if page.names.is_empty() && page.num_rows == 0 {
            return Ok(());
        }
        if self.names.is_empty() && self.num_rows == 0 {
            *self = page;
            return Ok(());
        }
        error_stack::ensure!(
            self.names == page.names,
            Error::MismatchedPage {
                expected: self.names.join(","),
                actual: page.names.join(","),
            }
        );

        for (column, values) in self.columns.iter_mut().zip(page.columns) {
            column.extend(values);
        }
        self.num_rows += page.num_rows;
        Ok(())
    }

    /// Keep at most `len` rows.
    pub fn truncate(&mut self, len: usize) {
        for column in self.columns.iter_mut() {
            column.truncate(len);
        }
        self.num_rows = self.num_rows.min(len);
    }

    /// Resolve the type of each column and convert the text to it.
    pub fn decode(self, overrides: &TypeOverrides) -> error_stack::Result<Table, Error> {
        let explicit = overrides.resolve(&self.names)?;

        let mut fields = Vec::with_capacity(self.names.len());
        let mut arrays = Vec::with_capacity(self.names.len());
        for ((name, values), explicit) in self.names.iter().zip(self.columns).zip(explicit) {
            let text = StringArray::from(values);
            let array = match explicit {
                Some(column_type) => convert(name, &text, column_type)?,
                None => {
                    let column_type = infer_column_type(name, &text)?;
                    match convert(name, &text, column_type) {
                        Ok(array) => array,
                        Err(e) => {
                            // Inference only looks at the shape of the values, so
                            // e.g. integers wider than 64 bits can fail to convert.
                            tracing::debug!("keeping column '{name}' as text: {e:?}");
                            Arc::new(text)
                        }
                    }
                }
            };
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        let schema = Arc::new(Schema::new(fields));
        RecordBatch::try_new_with_options(
            schema,
            arrays,
            &RecordBatchOptions::new().with_row_count(Some(self.num_rows)),
        )
        .into_report()
        .change_context(Error::Assemble)
    }
}

fn convert(
    name: &str,
    text: &StringArray,
    column_type: ColumnType,
) -> error_stack::Result<ArrayRef, Error> {
    let array: ArrayRef = match column_type {
        ColumnType::String => Arc::new(text.clone()),
        // The service writes booleans as `true` / `false`; anything other
        // than `true` is false.
        ColumnType::Boolean => Arc::new(
            text.iter()
                .map(|value| value.map(|value| value == "true"))
                .collect::<BooleanArray>(),
        ),
        ColumnType::Timestamp => Arc::new(
            parse_timestamps(text).change_context_lazy(|| Error::Convert {
                column: name.to_owned(),
                column_type: column_type.to_string(),
            })?,
        ),
        _ => {
            let options = CastOptions {
                safe: false,
                ..CastOptions::default()
            };
            cast_with_options(text, &column_type.data_type(), &options)
                .into_report()
                .change_context_lazy(|| Error::Convert {
                    column: name.to_owned(),
                    column_type: column_type.to_string(),
                })?
        }
    };
    Ok(array)
}
