//! Partition plans consumed by the in-process backend.
//!
//! A `PartitionPlan<T>` is an immutable, ordered list of named tasks; task
//! `i` materializes output partition `i`. Cloning a plan is cheap and the
//! same plan may be run any number of times.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parx_core::types::RowBatch;
use parx_io::{FileFormat, FileInfo, RunnerIo};

use crate::error::TaskError;
use crate::scheduler::CancelToken;

type TaskFn<T> = dyn Fn(&TaskContext) -> Result<T, TaskError> + Send + Sync;

/// What a task knows about the attempt it is running in.
#[derive(Debug, Clone)]
pub struct TaskContext {
    partition_index: usize,
    attempt: u32,
    cancel: CancelToken,
}

impl TaskContext {
    pub(crate) fn new(partition_index: usize, attempt: u32, cancel: CancelToken) -> Self {
        Self {
            partition_index,
            attempt,
            cancel,
        }
    }

    pub fn partition_index(&self) -> usize {
        self.partition_index
    }

    /// Zero on the first try, incremented per retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Long-running tasks should poll this and bail out with
    /// `TaskError::Cancelled` once the consumer went away.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub(crate) struct PartitionTask<T> {
    pub(crate) name: String,
    pub(crate) run: Arc<TaskFn<T>>,
}

impl<T> Clone for PartitionTask<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

pub struct PartitionPlan<T> {
    tasks: Arc<Vec<PartitionTask<T>>>,
}

impl<T: Send + 'static> PartitionPlan<T> {
    pub fn builder() -> PartitionPlanBuilder<T> {
        PartitionPlanBuilder { tasks: Vec::new() }
    }

    /// Plan whose partitions are already materialized values.
    pub fn from_partitions(partitions: Vec<T>) -> Self
    where
        T: Clone + Sync,
    {
        let mut builder = Self::builder();
        for (i, part) in partitions.into_iter().enumerate() {
            builder = builder.task(format!("value-{i}"), move |_| Ok(part.clone()));
        }
        builder.build()
    }

    pub fn num_partitions(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Stable hex digest of the task layout, used as the plan id in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.tasks.len() as u64).to_le_bytes());
        for t in self.tasks.iter() {
            hasher.update(t.name.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().as_str()[..16].to_string()
    }

    pub(crate) fn tasks(&self) -> Arc<Vec<PartitionTask<T>>> {
        Arc::clone(&self.tasks)
    }
}

impl PartitionPlan<RowBatch> {
    /// One read task per file, in the order given.
    pub fn scan_files<I: RunnerIo>(io: Arc<I>, files: &[FileInfo]) -> Self {
        let mut builder = Self::builder();
        for file in files {
            let io = Arc::clone(&io);
            let path: PathBuf = file.path.clone();
            let format: FileFormat = file.format;
            builder = builder.task(format!("scan:{}", path.display()), move |_| {
                Ok(io.read_partition(&path, format)?)
            });
        }
        builder.build()
    }
}

impl<T> Clone for PartitionPlan<T> {
    fn clone(&self) -> Self {
        Self {
            tasks: Arc::clone(&self.tasks),
        }
    }
}

impl<T> fmt::Debug for PartitionPlan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionPlan")
            .field(
                "tasks",
                &self.tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub struct PartitionPlanBuilder<T> {
    tasks: Vec<PartitionTask<T>>,
}

impl<T: Send + 'static> PartitionPlanBuilder<T> {
    /// Append the task for the next partition index.
    pub fn task<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TaskContext) -> Result<T, TaskError> + Send + Sync + 'static,
    {
        self.tasks.push(PartitionTask {
            name: name.into(),
            run: Arc::new(f),
        });
        self
    }

    pub fn build(self) -> PartitionPlan<T> {
        PartitionPlan {
            tasks: Arc::new(self.tasks),
        }
    }
}
