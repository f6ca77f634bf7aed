//! Streaming CSV writer from `RowBatch`.
//!
//! Writes the header with the first batch; values are rendered with
//! `to_string()`, Null as an empty cell.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv as csv_crate;
use parx_core::types::{RowBatch, Scalar};

use crate::error::{Error, Result};

pub struct CsvWriter<W: Write> {
    wtr: csv_crate::Writer<W>,
    header: Option<Vec<String>>,
}

impl CsvWriter<File> {
    pub fn to_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::to_writer(file))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            wtr: csv_crate::Writer::from_writer(writer),
            header: None,
        }
    }

    /// Write `batch`; every batch after the first must have the same columns.
    pub fn write_batch(&mut self, batch: &RowBatch) -> Result<()> {
        let names: Vec<String> = batch.columns.iter().map(|c| c.name.clone()).collect();
        match &self.header {
            None => {
                self.wtr.write_record(&names)?;
                self.header = Some(names);
            }
            Some(header) if *header != names => {
                return Err(Error::Schema(format!(
                    "batch columns {:?} do not match header {:?}",
                    names, header
                )));
            }
            Some(_) => {}
        }

        for row_idx in 0..batch.num_rows() {
            let row: Vec<String> = batch
                .columns
                .iter()
                .map(|c| c.values.get(row_idx).map(scalar_to_string).unwrap_or_default())
                .collect();
            self.wtr.write_record(&row)?;
        }
        self.wtr.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.wtr
            .into_inner()
            .map_err(|e| Error::Other(format!("failed to flush CSV writer: {}", e.error())))
    }
}

fn scalar_to_string(v: &Scalar) -> String {
    match v {
        Scalar::Null => String::new(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::I32(i) => i.to_string(),
        Scalar::I64(i) => i.to_string(),
        Scalar::F32(f) => f.to_string(),
        Scalar::F64(f) => f.to_string(),
        Scalar::Str(s) => s.clone(),
        Scalar::Bin(b) => String::from_utf8_lossy(b).into_owned(),
    }
}
