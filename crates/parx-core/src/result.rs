//! The unit yielded by streaming execution.

use std::time::Duration;

use crate::partition::{Partition, PartitionMetadata};

/// One materialized output partition plus what the runner learned while
/// producing it.
#[derive(Debug, Clone)]
pub struct MaterializedResult<T> {
    index: usize,
    partition: T,
    metadata: PartitionMetadata,
    attempts: u32,
    elapsed: Duration,
}

impl<T: Partition> MaterializedResult<T> {
    pub fn new(index: usize, partition: T, attempts: u32, elapsed: Duration) -> Self {
        let metadata = PartitionMetadata::from_partition(&partition);
        Self {
            index,
            partition,
            metadata,
            attempts,
            elapsed,
        }
    }
}

impl<T> MaterializedResult<T> {
    /// Position of this partition in the plan's output.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn partition(&self) -> &T {
        &self.partition
    }

    pub fn into_partition(self) -> T {
        self.partition
    }

    pub fn metadata(&self) -> PartitionMetadata {
        self.metadata
    }

    /// Number of attempts it took (1 unless recoverable failures were retried).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Wall time spent materializing, retries included.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
