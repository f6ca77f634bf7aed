#![forbid(unsafe_code)]
//! parx-exec: the runner contract and the in-process backend.
//!
//! - `runner`: the `Runner` trait every backend implements, plus the
//!   `RunnerBackend` discriminator.
//! - `plan`: `PartitionPlan`, an ordered list of named partition tasks.
//! - `scheduler`: worker threads gated by a permit count equal to the
//!   results buffer size, with retry of recoverable task failures.
//! - `stream`: the cancellable, index-ordered `ResultStream` and the
//!   `Tables` projection.
//! - `local`: `LocalRunner`, the in-process backend.

pub mod error;
pub mod local;
pub mod plan;
pub mod runner;
pub mod scheduler;
pub mod stream;

pub use error::TaskError;
pub use local::LocalRunner;
pub use plan::{PartitionPlan, PartitionPlanBuilder, TaskContext};
pub use runner::{Runner, RunnerBackend};
pub use scheduler::CancelToken;
pub use stream::{ResultStream, Tables};
