//! Lightweight row-batch partitions.
//!
//! `RowBatch` is the table representation the local backend and the
//! file-based `RunnerIo` produce. Backends that hold partitions elsewhere
//! (remote handles, native buffers) plug in their own `Partition` type.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::partition::Partition;

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
    /// Rough in-memory footprint used for partition size estimates.
    pub fn approx_size(&self) -> usize {
        match self {
            Scalar::Null | Scalar::Bool(_) => 1,
            Scalar::I32(_) | Scalar::F32(_) => 4,
            Scalar::I64(_) | Scalar::F64(_) => 8,
            Scalar::Str(s) => s.len(),
            Scalar::Bin(b) => b.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append `other` below `self`. Column names must line up.
    pub fn concat(mut self, other: RowBatch) -> Result<RowBatch> {
        if self.columns.is_empty() {
            return Ok(other);
        }
        if other.columns.is_empty() {
            return Ok(self);
        }
        if self.columns.len() != other.columns.len() {
            return Err(Error::Invariant(format!(
                "cannot concat batches with {} and {} columns",
                self.columns.len(),
                other.columns.len()
            )));
        }
        for (dst, src) in self.columns.iter_mut().zip(other.columns) {
            if dst.name != src.name {
                return Err(Error::Invariant(format!(
                    "column mismatch on concat: '{}' vs '{}'",
                    dst.name, src.name
                )));
            }
            dst.values.extend(src.values);
        }
        Ok(self)
    }
}

impl Partition for RowBatch {
    fn num_rows(&self) -> usize {
        RowBatch::num_rows(self)
    }

    fn size_bytes(&self) -> Option<usize> {
        Some(
            self.columns
                .iter()
                .map(|c| c.values.iter().map(Scalar::approx_size).sum::<usize>())
                .sum(),
        )
    }
}
