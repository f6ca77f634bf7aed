//! Streaming NDJSON reader → `RowBatch`.
//!
//! The column set is the union of keys seen so far; rows missing a key get
//! Null. Arrays and objects are stringified.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use parx_core::schema::{DataType, Field, Schema};
use parx_core::types::{Column, RowBatch, Scalar};
use serde_json::Value;

use crate::error::{Error, Result};

pub struct JsonlReader<R: Read> {
    reader: BufReader<R>,
    schema: Schema,
    line_no: usize,
}

impl JsonlReader<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path)?;
        Ok(Self::from_reader(f))
    }
}

impl<R: Read> JsonlReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            schema: Schema::new(vec![]),
            line_no: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn next_batch(&mut self, limit_rows: usize) -> Result<Option<RowBatch>> {
        if limit_rows == 0 {
            return Ok(Some(RowBatch { columns: vec![] }));
        }

        let mut parsed = Vec::with_capacity(limit_rows.min(1024));
        while parsed.len() < limit_rows {
            let mut s = String::new();
            let n = self.reader.read_line(&mut s)?;
            if n == 0 {
                break;
            }
            self.line_no += 1;
            if s.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&s)? {
                Value::Object(map) => parsed.push(map),
                other => {
                    return Err(Error::Schema(format!(
                        "line {}: expected a JSON object, got {}",
                        self.line_no,
                        type_name(&other)
                    )))
                }
            }
        }
        if parsed.is_empty() {
            return Ok(None);
        }

        // Ensure schema covers all keys
        let keys: BTreeSet<&String> = parsed.iter().flat_map(|m| m.keys()).collect();
        for k in keys {
            if self.schema.index_of(k).is_none() {
                self.schema
                    .fields
                    .push(Field::new(k.clone(), DataType::Utf8, true));
            }
        }

        let mut cols: Vec<Column> = self
            .schema
            .fields
            .iter()
            .map(|f| Column {
                name: f.name.clone(),
                values: Vec::with_capacity(parsed.len()),
            })
            .collect();

        for mut map in parsed {
            for (col, f) in cols.iter_mut().zip(&self.schema.fields) {
                let v = map.remove(&f.name).unwrap_or(Value::Null);
                col.values.push(to_scalar(v));
            }
        }

        Ok(Some(RowBatch { columns: cols }))
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn to_scalar(v: Value) -> Scalar {
    match v {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Scalar::I64(i)
            } else if let Some(f) = n.as_f64() {
                Scalar::F64(f)
            } else {
                Scalar::Str(n.to_string())
            }
        }
        Value::String(s) => Scalar::Str(s),
        other => Scalar::Str(other.to_string()),
    }
}
