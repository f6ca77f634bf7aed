#![forbid(unsafe_code)]
//! parx-cli: plan files and the `parx` binary.

pub mod plan_file;

pub use plan_file::{load_plan_file, parse_plan_file, PlanFile, PlanFileError, PartitionSource};
