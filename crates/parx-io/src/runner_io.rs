//! The I/O capability a runner exposes, and its local filesystem backing.
//!
//! A backend's `runner_io()` returns one of these so callers can discover
//! input files, infer their schema, and move `RowBatch` partitions in and
//! out of external storage without knowing which backend they talk to.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use parx_core::schema::Schema;
use parx_core::types::RowBatch;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::readers::{CsvReader, JsonlReader};
use crate::writers::CsvWriter;

/// Rows read per chunk before chunks are concatenated into one partition.
pub const DEFAULT_BATCH_ROWS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Jsonl,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Jsonl => "jsonl",
        }
    }

    /// Format implied by a path's extension (`.ndjson` counts as JSONL).
    pub fn from_path(path: &Path) -> Option<FileFormat> {
        match path.extension()?.to_str()? {
            "csv" => Some(FileFormat::Csv),
            "jsonl" | "ndjson" => Some(FileFormat::Jsonl),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "jsonl" | "ndjson" => Ok(FileFormat::Jsonl),
            other => Err(Error::Other(format!("unknown file format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub format: FileFormat,
}

/// Storage access surface of a runner backend.
pub trait RunnerIo: Send + Sync + 'static {
    /// Files of `format` under `path` sorted by path. A file path lists itself.
    fn list_files(&self, path: &Path, format: FileFormat) -> Result<Vec<FileInfo>>;

    fn infer_schema(&self, path: &Path, format: FileFormat) -> Result<Schema>;

    /// Read a whole file as one partition.
    fn read_partition(&self, path: &Path, format: FileFormat) -> Result<RowBatch>;

    fn write_partition(&self, batch: &RowBatch, path: &Path, format: FileFormat) -> Result<()>;
}

/// `RunnerIo` over the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalRunnerIo {
    batch_rows: usize,
}

impl Default for LocalRunnerIo {
    fn default() -> Self {
        Self {
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }
}

impl LocalRunnerIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_rows(batch_rows: usize) -> Self {
        Self {
            batch_rows: batch_rows.max(1),
        }
    }

    pub fn batch_rows(&self) -> usize {
        self.batch_rows
    }

    fn read_csv(&self, path: &Path) -> Result<RowBatch> {
        let mut rdr = CsvReader::from_path(path)?;
        let mut out = RowBatch::default();
        while let Some(batch) = rdr.next_batch(self.batch_rows)? {
            out = out.concat(batch)?;
        }
        if out.columns.is_empty() {
            // Header-only file: keep the columns, zero rows.
            out = RowBatch::new(
                rdr.schema()
                    .fields
                    .iter()
                    .map(|f| parx_core::types::Column::new(f.name.clone(), vec![]))
                    .collect(),
            );
        }
        Ok(out)
    }

    fn read_jsonl(&self, path: &Path) -> Result<RowBatch> {
        // One pass so late keys are visible to every row of the partition.
        let mut rdr = JsonlReader::from_path(path)?;
        Ok(rdr.next_batch(usize::MAX)?.unwrap_or_default())
    }
}

impl RunnerIo for LocalRunnerIo {
    fn list_files(&self, path: &Path, format: FileFormat) -> Result<Vec<FileInfo>> {
        let meta = fs::metadata(path)
            .map_err(|e| Error::from(e).with_context(format!("listing '{}'", path.display())))?;
        if meta.is_file() {
            return Ok(vec![FileInfo {
                path: path.to_path_buf(),
                size_bytes: meta.len(),
                format,
            }]);
        }

        let mut files = Vec::new();
        for dirent in fs::read_dir(path)? {
            let dirent = dirent?;
            let p = dirent.path();
            if FileFormat::from_path(&p) != Some(format) {
                continue;
            }
            let meta = dirent.metadata()?;
            if meta.is_file() {
                files.push(FileInfo {
                    path: p,
                    size_bytes: meta.len(),
                    format,
                });
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    fn infer_schema(&self, path: &Path, format: FileFormat) -> Result<Schema> {
        match format {
            FileFormat::Csv => Ok(CsvReader::from_path(path)?.schema().clone()),
            FileFormat::Jsonl => {
                let mut rdr = JsonlReader::from_path(path)?;
                rdr.next_batch(self.batch_rows)?;
                Ok(rdr.schema().clone())
            }
        }
    }

    fn read_partition(&self, path: &Path, format: FileFormat) -> Result<RowBatch> {
        let res = match format {
            FileFormat::Csv => self.read_csv(path),
            FileFormat::Jsonl => self.read_jsonl(path),
        };
        res.map_err(|e| e.with_context(format!("reading '{}'", path.display())))
    }

    fn write_partition(&self, batch: &RowBatch, path: &Path, format: FileFormat) -> Result<()> {
        match format {
            FileFormat::Csv => {
                let mut wtr = CsvWriter::to_path(path)?;
                wtr.write_batch(batch)?;
                Ok(())
            }
            FileFormat::Jsonl => Err(Error::Unimplemented("JSONL output")),
        }
    }
}
