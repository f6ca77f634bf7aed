//! Streaming CSV reader → `RowBatch`.
//!
//! Without an explicit schema every column is read as Utf8. With one,
//! values are parsed per field type and unparseable cells become Null.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv as csv_crate;
use parx_core::schema::{DataType, Field, Schema};
use parx_core::types::{Column, RowBatch, Scalar};

use crate::error::{Error, Result};

pub struct CsvReader<R: Read> {
    rdr: csv_crate::Reader<R>,
    schema: Schema,
    /// Position of each schema field in the file's records.
    positions: Vec<Option<usize>>,
}

impl CsvReader<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> CsvReader<R> {
    /// Reader whose schema comes from the header row (all Utf8).
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut rdr = csv_crate::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.trim().to_string()).collect();
        if headers.is_empty() {
            return Err(Error::Schema("CSV input has no header row".into()));
        }

        let positions = (0..headers.len()).map(Some).collect();
        let schema = Schema::new(
            headers
                .into_iter()
                .map(|h| Field::new(h, DataType::Utf8, true))
                .collect(),
        );

        Ok(Self {
            rdr,
            schema,
            positions,
        })
    }

    /// Reader that maps header names onto `schema` and parses typed values.
    ///
    /// Every schema field must appear in the header.
    pub fn from_reader_with_schema(reader: R, schema: Schema) -> Result<Self> {
        let mut rdr = csv_crate::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut positions = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let pos = headers.iter().position(|h| h.trim() == field.name.trim());
            if pos.is_none() {
                return Err(Error::Schema(format!(
                    "CSV input missing required column '{}'. Available columns: {:?}",
                    field.name,
                    headers.iter().collect::<Vec<_>>()
                )));
            }
            positions.push(pos);
        }

        Ok(Self {
            rdr,
            schema,
            positions,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Read up to `limit_rows` rows into a `RowBatch`; `None` at end of input.
    pub fn next_batch(&mut self, limit_rows: usize) -> Result<Option<RowBatch>> {
        if limit_rows == 0 {
            return Ok(Some(RowBatch { columns: vec![] }));
        }

        let mut cols: Vec<Column> = self
            .schema
            .fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                values: Vec::with_capacity(limit_rows.min(1024)),
            })
            .collect();

        let mut read_rows = 0usize;
        for rec in self.rdr.records() {
            let rec = rec?;
            for ((col, field), pos) in cols
                .iter_mut()
                .zip(&self.schema.fields)
                .zip(&self.positions)
            {
                // Flexible CSV may have short rows; missing cells become Null.
                let v = match pos.and_then(|p| rec.get(p)) {
                    Some(raw) => parse_scalar(raw, &field.data_type),
                    None => Scalar::Null,
                };
                col.values.push(v);
            }
            read_rows += 1;
            if read_rows >= limit_rows {
                break;
            }
        }

        if read_rows == 0 {
            return Ok(None);
        }

        Ok(Some(RowBatch { columns: cols }))
    }
}

fn parse_scalar(value: &str, data_type: &DataType) -> Scalar {
    match data_type {
        DataType::Int32 => value.parse::<i32>().map(Scalar::I32).unwrap_or(Scalar::Null),
        DataType::Int64 => value.parse::<i64>().map(Scalar::I64).unwrap_or(Scalar::Null),
        DataType::Float32 => value.parse::<f32>().map(Scalar::F32).unwrap_or(Scalar::Null),
        DataType::Float64 => value.parse::<f64>().map(Scalar::F64).unwrap_or(Scalar::Null),
        DataType::Boolean => value.parse::<bool>().map(Scalar::Bool).unwrap_or(Scalar::Null),
        DataType::Binary => Scalar::Bin(value.as_bytes().to_vec()),
        DataType::Utf8 => Scalar::Str(value.to_string()),
    }
}
