//! YAML plan files → `PartitionPlan<RowBatch>`.
//!
//! Example:
//! ```yaml
//! partitions:
//!   - op: scan
//!     path: "data/users.csv"
//!   - op: scan                      # one partition per file
//!     path: "data/events"
//!     format: jsonl
//! ```
//!
//! Relative paths resolve against the plan file's directory when loaded with
//! `load_plan_file`. `format` defaults to the file extension.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parx_core::types::RowBatch;
use parx_exec::PartitionPlan;
use parx_io::{FileFormat, FileInfo, RunnerIo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("cannot read plan file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid plan: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] parx_io::error::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    pub partitions: Vec<PartitionSource>,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum PartitionSource {
    /// A file (one partition) or a directory (one partition per matching file).
    Scan {
        path: PathBuf,
        #[serde(default)]
        format: Option<FileFormat>,
    },
}

/// Parse and validate plan YAML. Paths are kept as written.
pub fn parse_plan_file(yaml_src: &str) -> Result<PlanFile, PlanFileError> {
    let doc: PlanFile = serde_yaml::from_str(yaml_src)?;
    if doc.partitions.is_empty() {
        return Err(PlanFileError::Invalid("plan lists no partitions".into()));
    }
    for source in &doc.partitions {
        let PartitionSource::Scan { path, format } = source;
        if format.is_none() && path.extension().is_some() && FileFormat::from_path(path).is_none() {
            return Err(PlanFileError::Invalid(format!(
                "cannot infer format of '{}'; set `format` explicitly",
                path.display()
            )));
        }
    }
    Ok(doc)
}

/// Read a plan file from disk, resolving relative paths against its directory.
pub fn load_plan_file(path: &Path) -> Result<PlanFile, PlanFileError> {
    let src = fs::read_to_string(path).map_err(|source| PlanFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut doc = parse_plan_file(&src)?;
    doc.base_dir = path.parent().map(Path::to_path_buf);
    Ok(doc)
}

impl PlanFile {
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Expand every source into concrete input files, in plan order.
    pub fn resolve_files<I: RunnerIo>(&self, io: &I) -> Result<Vec<FileInfo>, PlanFileError> {
        let mut files = Vec::new();
        for source in &self.partitions {
            let PartitionSource::Scan { path, format } = source;
            let path = self.resolve(path);
            let format = match format.or_else(|| FileFormat::from_path(&path)) {
                Some(f) => f,
                None => {
                    return Err(PlanFileError::Invalid(format!(
                        "cannot infer format of '{}'; set `format` explicitly",
                        path.display()
                    )))
                }
            };
            let found = io.list_files(&path, format)?;
            if found.is_empty() {
                return Err(PlanFileError::Invalid(format!(
                    "no {} files under '{}'",
                    format,
                    path.display()
                )));
            }
            files.extend(found);
        }
        Ok(files)
    }

    /// Build the runnable plan: one scan task per resolved file.
    pub fn build_plan<I: RunnerIo>(
        &self,
        io: Arc<I>,
    ) -> Result<(PartitionPlan<RowBatch>, Vec<FileInfo>), PlanFileError> {
        let files = self.resolve_files(io.as_ref())?;
        Ok((PartitionPlan::scan_files(io, &files), files))
    }
}
