//! In-process backend.
//!
//! Partitions are materialized on a pool of worker threads owned by each
//! stream. `run` is `run_iter` drained to completion followed by a single
//! registration, so a failure anywhere leaves the cache untouched.

use std::sync::Arc;

use parx_core::cache::{PartitionCacheEntry, PartitionSetCache};
use parx_core::config::RunnerConfig;
use parx_core::error::{Error, Result};
use parx_core::partition::{Partition, PartitionSet};
use parx_io::LocalRunnerIo;

use crate::plan::PartitionPlan;
use crate::runner::{Runner, RunnerBackend};
use crate::scheduler::{self, SchedulerOptions};
use crate::stream::ResultStream;

pub struct LocalRunner<T: Partition> {
    config: RunnerConfig,
    cache: PartitionSetCache<T>,
    io: Arc<LocalRunnerIo>,
}

impl<T: Partition> LocalRunner<T> {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        Self::with_io(config, LocalRunnerIo::default())
    }

    /// Runner configured from `PARX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RunnerConfig::from_env()?)
    }

    pub fn with_io(config: RunnerConfig, io: LocalRunnerIo) -> Result<Self> {
        config.validate()?;
        let cache = <Self as Runner>::initialize_partition_set_cache(&config);
        Ok(Self {
            config,
            cache,
            io: Arc::new(io),
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Shared handle to the I/O surface, for building scan plans.
    pub fn io_handle(&self) -> Arc<LocalRunnerIo> {
        Arc::clone(&self.io)
    }

    fn options(&self, results_buffer_size: Option<usize>) -> Result<SchedulerOptions> {
        let buffer = match results_buffer_size {
            Some(0) => {
                return Err(Error::Config(
                    "results buffer size must be at least 1".into(),
                ))
            }
            Some(n) => n,
            None => self.config.results_buffer_size,
        };
        Ok(SchedulerOptions {
            num_workers: self.config.num_workers,
            results_buffer_size: buffer,
            max_task_retries: self.config.max_task_retries,
        })
    }
}

impl<T: Partition> Runner for LocalRunner<T> {
    type Partition = T;
    type Plan = PartitionPlan<T>;
    type Io = LocalRunnerIo;
    type Results = ResultStream<T>;

    fn backend(&self) -> RunnerBackend {
        RunnerBackend::InProcess
    }

    fn runner_io(&self) -> &LocalRunnerIo {
        &self.io
    }

    fn run(&self, plan: &PartitionPlan<T>) -> Result<PartitionCacheEntry<T>> {
        let expected = plan.num_partitions();
        let stream = self.run_iter(plan, None)?;

        let mut partitions = Vec::with_capacity(expected);
        for result in stream {
            match result {
                Ok(materialized) => partitions.push(materialized.into_partition()),
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(
                        plan = %plan.fingerprint(),
                        completed = partitions.len(),
                        total = expected,
                        error = %e,
                        "plan execution failed; nothing registered"
                    );
                    return Err(e);
                }
            }
        }

        if partitions.len() != expected {
            return Err(Error::Invariant(format!(
                "plan produced {} of {} partitions",
                partitions.len(),
                expected
            )));
        }

        let entry = self.cache.put(PartitionSet::new(partitions))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            plan = %plan.fingerprint(),
            pset_id = %entry.id(),
            partitions = entry.num_partitions(),
            rows = entry.num_rows(),
            "registered partition set"
        );

        Ok(entry)
    }

    fn run_iter(
        &self,
        plan: &PartitionPlan<T>,
        results_buffer_size: Option<usize>,
    ) -> Result<ResultStream<T>> {
        let opts = self.options(results_buffer_size)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            backend = %self.backend(),
            plan = %plan.fingerprint(),
            partitions = plan.num_partitions(),
            workers = opts.num_workers,
            buffer = opts.results_buffer_size,
            "starting plan execution"
        );

        Ok(scheduler::spawn(plan, opts))
    }

    fn get_partition_set_from_cache(&self, pset_id: &str) -> Result<PartitionCacheEntry<T>> {
        self.cache.entry(pset_id)
    }

    fn put_partition_set_into_cache(&self, pset: PartitionSet<T>) -> Result<PartitionCacheEntry<T>> {
        self.cache.put(pset)
    }

    fn num_cached_partition_sets(&self) -> usize {
        self.cache.len()
    }
}
