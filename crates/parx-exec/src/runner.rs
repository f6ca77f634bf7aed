//! The execution contract every backend implements.
//!
//! Callers depend on `Runner` only, never on a concrete backend. A runner
//! owns exactly one `PartitionSetCache`, built once through
//! `initialize_partition_set_cache` when the runner is constructed and
//! dropped with it. The cache itself stays private to the backend; callers
//! reach it only through the pass-through methods, which cannot remove or
//! clear registrations.

use std::fmt;
use std::str::FromStr;

use parx_core::cache::{PartitionCacheEntry, PartitionSetCache};
use parx_core::config::RunnerConfig;
use parx_core::error::{Error, Result};
use parx_core::partition::{Partition, PartitionSet};
use parx_core::result::MaterializedResult;
use parx_io::RunnerIo;
use serde::{Deserialize, Serialize};

use crate::stream::Tables;

/// Which kind of backend a runner is. Used for diagnostics and capability
/// checks by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerBackend {
    /// Executes on threads of the calling process.
    InProcess,
    /// Schedules work across remote workers.
    Clustered,
    /// Hands plans to a native execution engine.
    Native,
}

impl RunnerBackend {
    pub fn name(&self) -> &'static str {
        match self {
            RunnerBackend::InProcess => "in-process",
            RunnerBackend::Clustered => "clustered",
            RunnerBackend::Native => "native",
        }
    }
}

impl fmt::Display for RunnerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RunnerBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in-process" => Ok(RunnerBackend::InProcess),
            "clustered" => Ok(RunnerBackend::Clustered),
            "native" => Ok(RunnerBackend::Native),
            other => Err(Error::Config(format!("unknown runner backend '{other}'"))),
        }
    }
}

pub trait Runner: Send + Sync {
    /// Backend partition representation.
    type Partition: Partition;
    /// Plan object the backend executes; treated as immutable.
    type Plan;
    /// Storage access surface returned by `runner_io`.
    type Io: RunnerIo;
    /// Lazy result sequence returned by `run_iter`.
    type Results: Iterator<Item = Result<MaterializedResult<Self::Partition>>>;

    fn backend(&self) -> RunnerBackend;

    /// Build this runner's cache. Called exactly once, by the constructor.
    fn initialize_partition_set_cache(
        config: &RunnerConfig,
    ) -> PartitionSetCache<Self::Partition>
    where
        Self: Sized,
    {
        PartitionSetCache::with_config(config.cache.clone())
    }

    fn runner_io(&self) -> &Self::Io;

    /// Execute `plan` to completion and register its output.
    ///
    /// Either every partition materializes and the whole set is registered,
    /// or this fails with `Error::Execution` and nothing is registered.
    fn run(&self, plan: &Self::Plan) -> Result<PartitionCacheEntry<Self::Partition>>;

    /// Execute `plan`, yielding partitions as they complete.
    ///
    /// At most `results_buffer_size` results are held unconsumed before
    /// production pauses; `None` picks the backend default, which is always
    /// bounded. The sequence ends after the last partition or after the first
    /// error, cannot be restarted, and registers nothing in the cache.
    /// Dropping it cancels the remaining work.
    fn run_iter(
        &self,
        plan: &Self::Plan,
        results_buffer_size: Option<usize>,
    ) -> Result<Self::Results>;

    /// `run_iter` projected onto the bare partition values.
    fn run_iter_tables(
        &self,
        plan: &Self::Plan,
        results_buffer_size: Option<usize>,
    ) -> Result<Tables<Self::Results>> {
        Ok(Tables::new(self.run_iter(plan, results_buffer_size)?))
    }

    /// Handle for a set registered in this runner's cache, or `NotFound`.
    fn get_partition_set_from_cache(
        &self,
        pset_id: &str,
    ) -> Result<PartitionCacheEntry<Self::Partition>>;

    fn put_partition_set_into_cache(
        &self,
        pset: PartitionSet<Self::Partition>,
    ) -> Result<PartitionCacheEntry<Self::Partition>>;

    /// Number of sets currently registered in this runner's cache.
    fn num_cached_partition_sets(&self) -> usize;
}
