use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::builder::ColumnBuilder;
use crate::chunk::{Chunk, ColumnData, ColumnSummary, FrameInfo, Rollups};
use crate::error::{Result, StoreError};
use crate::types::{ColumnType, Number};
use crate::FrameStore;

/// In-process [`FrameStore`] keeping every sealed partition in memory.
///
/// A single `RwLock` guards the frame map. Builders are filled outside the
/// lock; only creation and sealing take the write side.
#[derive(Debug, Default)]
pub struct MemoryStore {
    frames: RwLock<HashMap<String, FrameState>>,
}

#[derive(Debug)]
struct FrameState {
    columns: Vec<ColumnMeta>,
    partitions: BTreeMap<usize, Vec<Arc<ColumnData>>>,
}

#[derive(Debug)]
struct ColumnMeta {
    name: String,
    column_type: ColumnType,
    domain: Arc<Vec<String>>,
    domain_index: HashMap<String, u32>,
}

impl ColumnMeta {
    fn new(name: String, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            domain: Arc::new(Vec::new()),
            domain_index: HashMap::new(),
        }
    }

    /// Domain code of `label`, appending it to the domain when new.
    ///
    /// The domain only grows, so chunks holding an older snapshot still
    /// resolve every code they contain.
    fn intern(&mut self, label: String) -> u32 {
        if let Some(&code) = self.domain_index.get(&label) {
            return code;
        }
        let code = self.domain.len() as u32;
        Arc::make_mut(&mut self.domain).push(label.clone());
        self.domain_index.insert(label, code);
        code
    }
}

impl FrameState {
    fn new(names: Vec<String>, types: &[ColumnType]) -> Self {
        Self {
            columns: names
                .into_iter()
                .zip(types)
                .map(|(name, &column_type)| ColumnMeta::new(name, column_type))
                .collect(),
            partitions: BTreeMap::new(),
        }
    }

    fn check_types(&self, key: &str, column_types: &[ColumnType]) -> Result<()> {
        if self.columns.len() != column_types.len() {
            return Err(StoreError::ColumnCountMismatch {
                key: key.to_string(),
                expected: self.columns.len(),
                actual: column_types.len(),
            });
        }
        for (column, (meta, &actual)) in self.columns.iter().zip(column_types).enumerate() {
            if meta.column_type != actual {
                return Err(StoreError::ColumnTypeMismatch {
                    key: key.to_string(),
                    column,
                    expected: meta.column_type,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn summary(&self, key: &str) -> FrameInfo {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, meta)| {
                let mut rollups = Rollups::default();
                for chunks in self.partitions.values() {
                    if let Some(data) = chunks.get(index) {
                        rollups.accumulate(data);
                    }
                }
                ColumnSummary {
                    name: meta.name.clone(),
                    column_type: meta.column_type,
                    domain: Arc::clone(&meta.domain),
                    rollups,
                }
            })
            .collect();
        FrameInfo {
            key: key.to_string(),
            columns,
            partitions: self.partitions.keys().copied().collect(),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame and load its values, split by the builder's chunk layout.
    pub fn put_frame(&self, frame: FrameBuilder) -> Result<FrameInfo> {
        frame.build(self)
    }

    /// Keys of every registered frame, sorted.
    pub fn frame_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.frames.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn create_frame(&self, key: &str, names: Vec<String>, types: &[ColumnType]) -> Result<()> {
        if types.is_empty() {
            return Err(StoreError::NoColumns(key.to_string()));
        }
        let mut frames = self.frames.write();
        if frames.contains_key(key) {
            return Err(StoreError::FrameExists(key.to_string()));
        }
        frames.insert(key.to_string(), FrameState::new(names, types));
        debug!(frame = key, columns = types.len(), "frame created");
        Ok(())
    }
}

fn default_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("C{i}")).collect()
}

impl FrameStore for MemoryStore {
    fn resolve_frame(&self, key: &str) -> Option<FrameInfo> {
        self.frames.read().get(key).map(|frame| frame.summary(key))
    }

    fn get_chunks(&self, key: &str, partition: usize) -> Result<Vec<Chunk>> {
        let frames = self.frames.read();
        let frame = frames
            .get(key)
            .ok_or_else(|| StoreError::FrameNotFound(key.to_string()))?;
        let chunks = frame
            .partitions
            .get(&partition)
            .ok_or_else(|| StoreError::PartitionNotFound {
                key: key.to_string(),
                partition,
            })?;
        Ok(chunks
            .iter()
            .zip(&frame.columns)
            .map(|(data, meta)| Chunk::new(Arc::clone(data), Arc::clone(&meta.domain)))
            .collect())
    }

    fn create_builders(
        &self,
        key: &str,
        column_types: &[ColumnType],
        partition: usize,
    ) -> Result<Vec<ColumnBuilder>> {
        if column_types.is_empty() {
            return Err(StoreError::NoColumns(key.to_string()));
        }
        let mut frames = self.frames.write();
        let frame = frames.entry(key.to_string()).or_insert_with(|| {
            debug!(frame = key, columns = column_types.len(), "frame created by ingest");
            FrameState::new(default_names(column_types.len()), column_types)
        });
        frame.check_types(key, column_types)?;
        if frame.partitions.contains_key(&partition) {
            return Err(StoreError::DuplicatePartition {
                key: key.to_string(),
                partition,
            });
        }
        Ok(column_types
            .iter()
            .enumerate()
            .map(|(column, &column_type)| ColumnBuilder::new(column, column_type))
            .collect())
    }

    fn seal_builders(
        &self,
        key: &str,
        partition: usize,
        builders: Vec<ColumnBuilder>,
    ) -> Result<()> {
        let mut frames = self.frames.write();
        let frame = frames
            .get_mut(key)
            .ok_or_else(|| StoreError::FrameNotFound(key.to_string()))?;

        let types: Vec<ColumnType> = builders.iter().map(ColumnBuilder::column_type).collect();
        frame.check_types(key, &types)?;
        if frame.partitions.contains_key(&partition) {
            return Err(StoreError::DuplicatePartition {
                key: key.to_string(),
                partition,
            });
        }
        let counts: Vec<usize> = builders.iter().map(ColumnBuilder::len).collect();
        if counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(StoreError::RaggedPartition { partition, counts });
        }

        let chunks = builders
            .into_iter()
            .zip(frame.columns.iter_mut())
            .map(|(builder, meta)| Arc::new(builder.finish(|label| meta.intern(label))))
            .collect();
        frame.partitions.insert(partition, chunks);
        debug!(
            frame = key,
            partition,
            rows = counts.first().copied().unwrap_or(0),
            "partition sealed"
        );
        Ok(())
    }
}

/// Values of one source column of a [`FrameBuilder`].
#[derive(Debug, Clone)]
enum SourceValues {
    Bad(usize),
    Numbers(Vec<Option<Number>>),
    Strings(Vec<Option<String>>),
    Uuids(Vec<Option<Uuid>>),
    Times(Vec<Option<i64>>),
}

impl SourceValues {
    fn len(&self) -> usize {
        match self {
            Self::Bad(len) => *len,
            Self::Numbers(v) => v.len(),
            Self::Strings(v) => v.len(),
            Self::Uuids(v) => v.len(),
            Self::Times(v) => v.len(),
        }
    }

    fn append_row(&self, row: usize, builder: &mut ColumnBuilder) -> Result<()> {
        match self {
            Self::Bad(_) => builder.append_na(),
            Self::Numbers(v) => match v[row] {
                Some(n) => builder.append_number(n),
                None => builder.append_na(),
            },
            Self::Strings(v) => match &v[row] {
                Some(s) => builder.append_string(s.clone()),
                None => builder.append_na(),
            },
            Self::Uuids(v) => match v[row] {
                Some(id) => builder.append_string(id.hyphenated().to_string()),
                None => builder.append_na(),
            },
            Self::Times(v) => match v[row] {
                Some(ms) => builder.append_number(Number::Int(ms)),
                None => builder.append_na(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct SourceColumn {
    name: String,
    column_type: ColumnType,
    values: SourceValues,
}

/// Declarative frame definition for [`MemoryStore::put_frame`].
///
/// ```
/// use extframe_store::{FrameBuilder, FrameStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let info = store
///     .put_frame(
///         FrameBuilder::new("prices")
///             .numeric("price", vec![Some(1.5), None, Some(3.0)])
///             .string("sym", vec![Some("a"), Some("b"), None])
///             .with_chunk_layout(vec![2, 1]),
///     )
///     .unwrap();
/// assert_eq!(info.partitions, vec![0, 1]);
/// assert_eq!(store.get_chunks("prices", 1).unwrap()[0].len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    key: String,
    columns: Vec<SourceColumn>,
    layout: Option<Vec<usize>>,
}

impl FrameBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            columns: Vec::new(),
            layout: None,
        }
    }

    fn column(mut self, name: &str, column_type: ColumnType, values: SourceValues) -> Self {
        self.columns.push(SourceColumn {
            name: name.to_string(),
            column_type,
            values,
        });
        self
    }

    /// Real-valued numeric column; `None` and NaN are missing.
    pub fn numeric(self, name: &str, values: Vec<Option<f64>>) -> Self {
        let values = values.into_iter().map(|v| v.map(Number::Real)).collect();
        self.column(name, ColumnType::Numeric, SourceValues::Numbers(values))
    }

    /// Integer-valued numeric column.
    pub fn int(self, name: &str, values: Vec<Option<i64>>) -> Self {
        let values = values.into_iter().map(|v| v.map(Number::Int)).collect();
        self.column(name, ColumnType::Numeric, SourceValues::Numbers(values))
    }

    pub fn string(self, name: &str, values: Vec<Option<&str>>) -> Self {
        let values = values.into_iter().map(|v| v.map(str::to_string)).collect();
        self.column(name, ColumnType::Str, SourceValues::Strings(values))
    }

    /// Categorical column; the domain is built in first-seen order.
    pub fn categorical(self, name: &str, labels: Vec<Option<&str>>) -> Self {
        let values = labels.into_iter().map(|v| v.map(str::to_string)).collect();
        self.column(name, ColumnType::Categorical, SourceValues::Strings(values))
    }

    pub fn uuid(self, name: &str, values: Vec<Option<Uuid>>) -> Self {
        self.column(name, ColumnType::Uuid, SourceValues::Uuids(values))
    }

    /// Time column in epoch milliseconds.
    pub fn time(self, name: &str, millis: Vec<Option<i64>>) -> Self {
        self.column(name, ColumnType::Time, SourceValues::Times(millis))
    }

    /// Column with no usable values, `rows` long.
    pub fn bad(self, name: &str, rows: usize) -> Self {
        self.column(name, ColumnType::Bad, SourceValues::Bad(rows))
    }

    /// Rows per partition, in partition order. Defaults to one partition.
    pub fn with_chunk_layout(mut self, rows_per_partition: Vec<usize>) -> Self {
        self.layout = Some(rows_per_partition);
        self
    }

    /// Load the frame through the regular builder path of `store`.
    pub fn build(self, store: &MemoryStore) -> Result<FrameInfo> {
        let counts: Vec<usize> = self.columns.iter().map(|c| c.values.len()).collect();
        if counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(StoreError::UnequalColumns {
                key: self.key,
                counts,
            });
        }
        let rows = counts.first().copied().unwrap_or(0);
        let layout = self.layout.clone().unwrap_or_else(|| vec![rows]);
        let covered: usize = layout.iter().sum();
        if covered != rows {
            return Err(StoreError::LayoutMismatch {
                key: self.key,
                rows,
                covered,
            });
        }

        let names = self.columns.iter().map(|c| c.name.clone()).collect();
        let types: Vec<ColumnType> = self.columns.iter().map(|c| c.column_type).collect();
        store.create_frame(&self.key, names, &types)?;

        let mut start = 0;
        for (partition, &len) in layout.iter().enumerate() {
            let mut builders = store.create_builders(&self.key, &types, partition)?;
            for row in start..start + len {
                for (source, builder) in self.columns.iter().zip(builders.iter_mut()) {
                    source.values.append_row(row, builder)?;
                }
            }
            store.seal_builders(&self.key, partition, builders)?;
            start += len;
        }

        store
            .resolve_frame(&self.key)
            .ok_or(StoreError::FrameNotFound(self.key))
    }
}
