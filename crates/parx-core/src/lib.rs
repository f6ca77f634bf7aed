#![forbid(unsafe_code)]
//! parx-core: shared kernel for the parx execution boundary.
//!
//! This crate contains only *pure* types, small helpers, and the
//! partition-set cache. There is **no I/O** and **no thread spawning** here.
//!
//! Crates that use this:
//! - parx-io: reads/writes `RowBatch` partitions for the `RunnerIo` surface.
//! - parx-exec: implements the `Runner` contract over `PartitionSet`s,
//!   streams `MaterializedResult`s, and registers outputs in the cache.
//! - parx-cli: builds plans from plan files and prints cache entries.

pub mod cache;
pub mod config;
pub mod error;
pub mod partition;
pub mod prelude;
pub mod result;
pub mod schema;
pub mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
