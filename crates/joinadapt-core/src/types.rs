//! Lightweight value/column/chunk types used as the join's row storage.
//!
//! The hash tables only store `RowPtr`s into a `ChunkList`; rows are read back
//! through the borrowed `Row` view.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DataType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(DataType::Boolean),
            Scalar::I32(_) => Some(DataType::Int32),
            Scalar::I64(_) => Some(DataType::Int64),
            Scalar::F32(_) => Some(DataType::Float32),
            Scalar::F64(_) => Some(DataType::Float64),
            Scalar::Str(_) => Some(DataType::Utf8),
            Scalar::Bin(_) => Some(DataType::Binary),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::I32(v) => Some(*v as i64),
            Scalar::I64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Minimal column representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A chunk of rows in columnar layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// An empty batch with the given column names.
    pub fn with_column_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names
                .into_iter()
                .map(|n| Column::new(n, Vec::new()))
                .collect(),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, idx: usize) -> Option<Row<'_>> {
        (idx < self.num_rows()).then_some(Row { batch: self, idx })
    }

    /// Append one row; `values` must supply exactly one scalar per column.
    pub fn push_row<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Scalar>,
    {
        let values: Vec<Scalar> = values.into_iter().collect();
        if values.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "row has {} values but batch has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        for (col, v) in self.columns.iter_mut().zip(values) {
            col.values.push(v);
        }
        Ok(())
    }

    /// Append all rows of `other`, matching columns by position.
    pub fn append(&mut self, other: RowBatch) -> Result<()> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns.len() != self.columns.len() {
            return Err(Error::Schema(format!(
                "cannot append batch with {} columns to batch with {} columns",
                other.columns.len(),
                self.columns.len()
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(other.columns) {
            dst.values.extend(src.values);
        }
        Ok(())
    }

    /// Column names for a join output: `left` names followed by `right` names,
    /// with right-side names suffixed `_right` when they collide.
    pub fn joined_names(left: &RowBatch, right: &RowBatch) -> Vec<String> {
        let mut names: Vec<String> = left.columns.iter().map(|c| c.name.clone()).collect();
        for col in &right.columns {
            if left.columns.iter().any(|c| c.name == col.name) {
                names.push(format!("{}_right", col.name));
            } else {
                names.push(col.name.clone());
            }
        }
        names
    }
}

/// Borrowed view of one row inside a batch.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    batch: &'a RowBatch,
    idx: usize,
}

impl<'a> Row<'a> {
    pub fn value(&self, col: usize) -> Option<&'a Scalar> {
        self.batch.columns.get(col).and_then(|c| c.values.get(self.idx))
    }

    pub fn is_null(&self, col: usize) -> bool {
        self.value(col).map(Scalar::is_null).unwrap_or(true)
    }

    pub fn to_values(&self) -> Vec<Scalar> {
        self.batch
            .columns
            .iter()
            .map(|c| c.values.get(self.idx).cloned().unwrap_or(Scalar::Null))
            .collect()
    }
}

/// Indirection into externally owned row storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowPtr {
    pub chunk_idx: u32,
    pub row_idx: u32,
}

impl RowPtr {
    pub const fn new(chunk_idx: u32, row_idx: u32) -> Self {
        Self { chunk_idx, row_idx }
    }
}

/// Append-only list of chunks addressed by `RowPtr`.
#[derive(Debug, Clone, Default)]
pub struct ChunkList {
    chunks: Vec<RowBatch>,
    rows: usize,
}

impl ChunkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return its index.
    pub fn add(&mut self, chunk: RowBatch) -> Result<u32> {
        let idx = u32::try_from(self.chunks.len())
            .map_err(|_| Error::Invariant("chunk list exceeds u32 chunks".into()))?;
        if u32::try_from(chunk.num_rows()).is_err() {
            return Err(Error::Invariant(format!(
                "chunk with {} rows cannot be addressed by a row pointer",
                chunk.num_rows()
            )));
        }
        self.rows += chunk.num_rows();
        self.chunks.push(chunk);
        Ok(idx)
    }

    pub fn chunk(&self, idx: u32) -> Option<&RowBatch> {
        self.chunks.get(idx as usize)
    }

    pub fn get_row(&self, ptr: RowPtr) -> Option<Row<'_>> {
        self.chunk(ptr.chunk_idx)?.row(ptr.row_idx as usize)
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }
}
