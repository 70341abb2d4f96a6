use std::sync::Arc;

use uuid::Uuid;

use crate::types::{ColumnType, Number};

/// Values of one column within one partition. `None` is a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Bad { len: usize },
    Uuid(Vec<Option<Uuid>>),
    Str(Vec<Option<String>>),
    Numeric(Vec<Option<Number>>),
    Categorical(Vec<Option<u32>>),
    Time(Vec<Option<i64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            Self::Bad { len } => *len,
            Self::Uuid(v) => v.len(),
            Self::Str(v) => v.len(),
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
            Self::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Bad { .. } => ColumnType::Bad,
            Self::Uuid(_) => ColumnType::Uuid,
            Self::Str(_) => ColumnType::Str,
            Self::Numeric(_) => ColumnType::Numeric,
            Self::Categorical(_) => ColumnType::Categorical,
            Self::Time(_) => ColumnType::Time,
        }
    }

    pub fn is_na(&self, row: usize) -> bool {
        match self {
            Self::Bad { .. } => true,
            Self::Uuid(v) => !matches!(v.get(row), Some(Some(_))),
            Self::Str(v) => !matches!(v.get(row), Some(Some(_))),
            Self::Numeric(v) => !matches!(v.get(row), Some(Some(_))),
            Self::Categorical(v) => !matches!(v.get(row), Some(Some(_))),
            Self::Time(v) => !matches!(v.get(row), Some(Some(_))),
        }
    }
}

/// Read-only view of one column of one sealed partition.
#[derive(Debug, Clone)]
pub struct Chunk {
    data: Arc<ColumnData>,
    domain: Arc<Vec<String>>,
}

impl Chunk {
    pub fn new(data: Arc<ColumnData>, domain: Arc<Vec<String>>) -> Self {
        Self { data, domain }
    }

    /// Number of rows in the partition.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    /// Category labels, indexed by code. Empty for non-categorical columns.
    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    pub fn is_na(&self, row: usize) -> bool {
        self.data.is_na(row)
    }

    /// Integer view of a numeric, time or categorical cell.
    pub fn int_value(&self, row: usize) -> Option<i64> {
        match &*self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(Number::as_i64),
            ColumnData::Time(v) => v.get(row).copied().flatten(),
            ColumnData::Categorical(v) => v.get(row).copied().flatten().map(i64::from),
            _ => None,
        }
    }

    /// Floating-point view of a numeric, time or categorical cell.
    pub fn float_value(&self, row: usize) -> Option<f64> {
        match &*self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(Number::as_f64),
            _ => self.int_value(row).map(|v| v as f64),
        }
    }

    /// Category code of a categorical cell.
    pub fn category(&self, row: usize) -> Option<u32> {
        match &*self.data {
            ColumnData::Categorical(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Raw text of a string cell.
    pub fn str_value(&self, row: usize) -> Option<&str> {
        match &*self.data {
            ColumnData::Str(v) => v.get(row).and_then(|s| s.as_deref()),
            _ => None,
        }
    }

    pub fn uuid_value(&self, row: usize) -> Option<Uuid> {
        match &*self.data {
            ColumnData::Uuid(v) => v.get(row).copied().flatten(),
            _ => None,
        }
    }

    /// Label of a categorical cell, resolved through the domain.
    pub fn label(&self, row: usize) -> Option<&str> {
        let code = self.category(row)?;
        self.domain.get(code as usize).map(String::as_str)
    }
}

/// Range statistics over all non-missing values of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rollups {
    pub min: f64,
    pub max: f64,
    /// True when every value is a whole number.
    pub is_integral: bool,
    pub na_count: usize,
    pub rows: usize,
}

impl Default for Rollups {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            is_integral: true,
            na_count: 0,
            rows: 0,
        }
    }
}

impl Rollups {
    /// Fold one partition's column into the running statistics.
    pub fn accumulate(&mut self, data: &ColumnData) {
        let values = match data {
            ColumnData::Numeric(values) => values,
            other => {
                self.rows += other.len();
                self.na_count += (0..other.len()).filter(|&r| other.is_na(r)).count();
                return;
            }
        };
        for value in values {
            self.rows += 1;
            let Some(value) = value else {
                self.na_count += 1;
                continue;
            };
            let v = value.as_f64();
            if self.rows - self.na_count == 1 {
                self.min = v;
                self.max = v;
            } else {
                self.min = self.min.min(v);
                self.max = self.max.max(v);
            }
            self.is_integral &= value.is_integral();
        }
    }
}

/// Column metadata as seen by the protocol.
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub column_type: ColumnType,
    pub domain: Arc<Vec<String>>,
    pub rollups: Rollups,
}

/// Snapshot of a frame's layout.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    pub key: String,
    pub columns: Vec<ColumnSummary>,
    /// Sealed partition indices, ascending.
    pub partitions: Vec<usize>,
}

impl FrameInfo {
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|c| c.column_type).collect()
    }
}
