//! Partitions and immutable partition sets.
//!
//! A `PartitionSet<T>` is the full output of one plan: partitions indexed
//! `0..n`, contiguous and fixed for the lifetime of the set. There is no
//! setter; producing a different set means building a new one.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Backend partition representation.
///
/// Implemented by in-memory tables (`RowBatch`), by handles to remotely held
/// fragments, or by anything else a backend materializes.
pub trait Partition: Send + Sync + 'static {
    fn num_rows(&self) -> usize;

    /// Approximate size in bytes, or `None` if the backend cannot tell
    /// without fetching the data.
    fn size_bytes(&self) -> Option<usize>;
}

impl<P: Partition> Partition for Arc<P> {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }

    fn size_bytes(&self) -> Option<usize> {
        (**self).size_bytes()
    }
}

impl<V: Send + Sync + 'static> Partition for Vec<V> {
    fn num_rows(&self) -> usize {
        self.len()
    }

    fn size_bytes(&self) -> Option<usize> {
        Some(self.len() * std::mem::size_of::<V>())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMetadata {
    pub num_rows: usize,
    pub size_bytes: Option<usize>,
}

impl PartitionMetadata {
    pub fn new(num_rows: usize, size_bytes: Option<usize>) -> Self {
        Self {
            num_rows,
            size_bytes,
        }
    }

    pub fn from_partition<P: Partition + ?Sized>(partition: &P) -> Self {
        Self::new(partition.num_rows(), partition.size_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionSet<T> {
    partitions: Vec<T>,
}

impl<T> PartitionSet<T> {
    /// Partition `i` of the set is `partitions[i]`.
    pub fn new(partitions: Vec<T>) -> Self {
        Self { partitions }
    }

    pub fn empty() -> Self {
        Self {
            partitions: Vec::new(),
        }
    }

    /// Build a set from `(index, partition)` pairs in any order.
    ///
    /// Indices must cover `0..n` exactly once.
    pub fn from_indexed(items: impl IntoIterator<Item = (usize, T)>) -> Result<Self> {
        let mut by_index = BTreeMap::new();
        for (idx, part) in items {
            if by_index.insert(idx, part).is_some() {
                return Err(Error::Invariant(format!(
                    "duplicate partition index {idx}"
                )));
            }
        }
        let mut partitions = Vec::with_capacity(by_index.len());
        for (expected, (idx, part)) in by_index.into_iter().enumerate() {
            if idx != expected {
                return Err(Error::Invariant(format!(
                    "partition indices are not contiguous: missing {expected}"
                )));
            }
            partitions.push(part);
        }
        Ok(Self { partitions })
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.partitions.get(idx)
    }

    pub fn has_partition(&self, idx: usize) -> bool {
        idx < self.partitions.len()
    }

    /// Partitions in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.partitions.iter()
    }

    pub fn items(&self) -> impl Iterator<Item = (usize, &T)> {
        self.partitions.iter().enumerate()
    }

    /// New set with `f` applied to every partition, indices preserved.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> PartitionSet<U> {
        PartitionSet {
            partitions: self.partitions.iter().map(f).collect(),
        }
    }

    pub fn into_partitions(self) -> Vec<T> {
        self.partitions
    }
}

impl<T: Partition> PartitionSet<T> {
    pub fn metadata(&self, idx: usize) -> Option<PartitionMetadata> {
        self.get(idx).map(PartitionMetadata::from_partition)
    }

    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(Partition::num_rows).sum()
    }

    /// Sum of partition sizes; `None` if any partition cannot report one.
    pub fn size_bytes(&self) -> Option<usize> {
        self.partitions.iter().map(Partition::size_bytes).sum()
    }
}

impl<T> Default for PartitionSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> FromIterator<T> for PartitionSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a PartitionSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.iter()
    }
}
