#![forbid(unsafe_code)]
//! parx: partitioned plan execution with a bounded results buffer and a
//! per-runner partition-set cache.
//!
//! Facade over the workspace crates:
//! - `parx_core`: partitions, partition sets, the cache, config and errors;
//! - `parx_io`: the `RunnerIo` capability and local CSV/JSONL files;
//! - `parx_exec`: the `Runner` contract and the in-process `LocalRunner`;
//! - `parx_cli`: plan files used by the `parx` binary.

pub use parx_cli;
pub use parx_core;
pub use parx_exec;
pub use parx_io;

pub mod prelude {
    pub use parx_core::prelude::*;
    pub use parx_exec::{LocalRunner, PartitionPlan, Runner, RunnerBackend, TaskError};
    pub use parx_io::{FileFormat, LocalRunnerIo, RunnerIo};
}
