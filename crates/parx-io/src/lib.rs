#![forbid(unsafe_code)]
//! parx-io: the `RunnerIo` capability and its local filesystem backing.
//!
//! - `runner_io`: the trait a runner exposes for reading/writing external
//!   storage, plus `LocalRunnerIo` over the local filesystem.
//! - `readers`: CSV/JSONL readers → `RowBatch`.
//! - `writers`: CSV writer from `RowBatch`.

pub mod readers;
pub mod runner_io;
pub mod writers;

pub mod error;

pub use runner_io::{FileFormat, FileInfo, LocalRunnerIo, RunnerIo};
