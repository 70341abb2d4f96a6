use uuid::Uuid;

use crate::chunk::ColumnData;
use crate::error::{Result, StoreError};
use crate::types::{ColumnType, Number};

/// Append-only accumulator for one column of a partition under construction.
///
/// Builders are handed out by [`crate::FrameStore::create_builders`] and only
/// become visible to readers once passed back to
/// [`crate::FrameStore::seal_builders`]. Dropping a builder discards it.
#[derive(Debug)]
pub struct ColumnBuilder {
    column: usize,
    values: Pending,
}

#[derive(Debug)]
enum Pending {
    Data(ColumnData),
    /// Categorical labels are interned into the frame's domain at seal time.
    Labels(Vec<Option<String>>),
}

impl ColumnBuilder {
    pub fn new(column: usize, column_type: ColumnType) -> Self {
        let values = match column_type {
            ColumnType::Bad => Pending::Data(ColumnData::Bad { len: 0 }),
            ColumnType::Uuid => Pending::Data(ColumnData::Uuid(Vec::new())),
            ColumnType::Str => Pending::Data(ColumnData::Str(Vec::new())),
            ColumnType::Numeric => Pending::Data(ColumnData::Numeric(Vec::new())),
            ColumnType::Categorical => Pending::Labels(Vec::new()),
            ColumnType::Time => Pending::Data(ColumnData::Time(Vec::new())),
        };
        Self { column, values }
    }

    /// Index of the column this builder fills.
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn column_type(&self) -> ColumnType {
        match &self.values {
            Pending::Data(data) => data.column_type(),
            Pending::Labels(_) => ColumnType::Categorical,
        }
    }

    /// Rows appended so far.
    pub fn len(&self) -> usize {
        match &self.values {
            Pending::Data(data) => data.len(),
            Pending::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a number to a numeric or time column. NaN is stored as missing.
    pub fn append_number(&mut self, value: Number) -> Result<()> {
        if value.is_nan() {
            return self.append_na();
        }
        match &mut self.values {
            Pending::Data(ColumnData::Numeric(values)) => values.push(Some(value)),
            Pending::Data(ColumnData::Time(values)) => {
                if !value.is_integral() {
                    return Err(self.mismatch("fractional number"));
                }
                values.push(Some(value.as_i64()));
            }
            _ => return Err(self.mismatch("number")),
        }
        Ok(())
    }

    /// Append text to a string, categorical or UUID column.
    pub fn append_string(&mut self, value: String) -> Result<()> {
        let column = self.column;
        match &mut self.values {
            Pending::Data(ColumnData::Str(values)) => values.push(Some(value)),
            Pending::Labels(labels) => labels.push(Some(value)),
            Pending::Data(ColumnData::Uuid(values)) => {
                let parsed = Uuid::parse_str(&value)
                    .map_err(|_| StoreError::InvalidUuid { column, text: value })?;
                values.push(Some(parsed));
            }
            _ => return Err(self.mismatch("string")),
        }
        Ok(())
    }

    /// Append a missing value. Accepted by every column type.
    pub fn append_na(&mut self) -> Result<()> {
        match &mut self.values {
            Pending::Data(ColumnData::Bad { len }) => *len += 1,
            Pending::Data(ColumnData::Uuid(values)) => values.push(None),
            Pending::Data(ColumnData::Str(values)) => values.push(None),
            Pending::Data(ColumnData::Numeric(values)) => values.push(None),
            Pending::Data(ColumnData::Categorical(values)) => values.push(None),
            Pending::Data(ColumnData::Time(values)) => values.push(None),
            Pending::Labels(labels) => labels.push(None),
        }
        Ok(())
    }

    /// Convert into sealed column data, interning categorical labels through
    /// `intern`, which returns the label's domain code.
    pub(crate) fn finish(self, mut intern: impl FnMut(String) -> u32) -> ColumnData {
        match self.values {
            Pending::Data(data) => data,
            Pending::Labels(labels) => ColumnData::Categorical(
                labels
                    .into_iter()
                    .map(|label| label.map(&mut intern))
                    .collect(),
            ),
        }
    }

    fn mismatch(&self, value: &'static str) -> StoreError {
        StoreError::AppendMismatch {
            column: self.column,
            column_type: self.column_type(),
            value,
        }
    }
}
