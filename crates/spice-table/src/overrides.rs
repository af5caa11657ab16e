use std::collections::BTreeMap;

use error_stack::ensure;

use crate::{ColumnType, Error};

/// Column types given either by position or by column name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTypes {
    /// Types by column position. `None` leaves a column to inference.
    Positional(Vec<Option<ColumnType>>),
    /// Types by column name.
    Named(BTreeMap<String, ColumnType>),
}

impl ColumnTypes {
    pub fn named<K: Into<String>>(types: impl IntoIterator<Item = (K, ColumnType)>) -> Self {
        Self::Named(types.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn positional(types: impl IntoIterator<Item = ColumnType>) -> Self {
        Self::Positional(types.into_iter().map(Some).collect())
    }

    fn lookup(&self, index: usize, name: &str) -> Option<ColumnType> {
        match self {
            Self::Positional(types) => types.get(index).copied().flatten(),
            Self::Named(types) => types.get(name).copied(),
        }
    }
}

/// How the types of the decoded columns are chosen.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeOverrides {
    /// Every column type is inferred from the data.
    #[default]
    Inferred,
    /// The given columns use the given types; all others are inferred.
    ///
    /// Names which do not appear in the data are ignored.
    Partial(ColumnTypes),
    /// Every column must be given a type, and every given type must match a
    /// column.
    Strict(ColumnTypes),
}

impl TypeOverrides {
    /// Determine the explicit type (if any) for each of the `columns`.
    ///
    /// Returns one entry per column, in the same order. `None` entries are
    /// left to inference.
    pub fn resolve(&self, columns: &[String]) -> error_stack::Result<Vec<Option<ColumnType>>, Error> {
        match self {
            Self::Inferred => Ok(vec![None; columns.len()]),
            Self::Partial(types) => Ok(columns
                .iter()
                .enumerate()
                .map(|(index, name)| types.lookup(index, name))
                .collect()),
            Self::Strict(types) => {
                match types {
                    ColumnTypes::Positional(positional) => {
                        ensure!(
                            positional.len() == columns.len(),
                            Error::PositionalTypeCount {
                                expected: columns.len(),
                                actual: positional.len(),
                            }
                        );
                    }
                    ColumnTypes::Named(named) => {
                        if let Some(unexpected) =
                            named.keys().find(|name| !columns.contains(name))
                        {
                            error_stack::bail!(Error::UnexpectedColumn(unexpected.clone()));
                        }
                    }
                }

                columns
                    .iter()
                    .enumerate()
                    .map(|(index, name)| match types.lookup(index, name) {
                        Some(column_type) => Ok(Some(column_type)),
                        None => Err(error_stack::report!(Error::MissingColumnType(
                            name.clone()
                        ))),
                    })
                    .collect()
            }
        }
    }
}
