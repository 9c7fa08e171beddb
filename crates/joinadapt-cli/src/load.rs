//! CSV loading with per-column type inference.
//!
//! A column is `Int64` if every non-empty cell parses as an integer,
//! `Float64` if every non-empty cell parses as a float, and `Utf8` otherwise.
//! Empty cells are null.

use std::path::Path;

use joinadapt_core::prelude::{Column, DataType, Field, RowBatch, Scalar, Schema};

pub struct LoadedTable {
    pub schema: Schema,
    pub chunks: Vec<RowBatch>,
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str>) -> (DataType, bool) {
    let mut ty = DataType::Int64;
    let mut nullable = false;
    for cell in cells {
        if cell.is_empty() {
            nullable = true;
            continue;
        }
        if ty == DataType::Int64 && cell.parse::<i64>().is_err() {
            ty = DataType::Float64;
        }
        if ty == DataType::Float64 && cell.parse::<f64>().is_err() {
            ty = DataType::Utf8;
        }
    }
    (ty, nullable)
}

fn to_scalar(cell: &str, ty: DataType) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    match ty {
        DataType::Int64 => cell.parse().map(Scalar::I64).unwrap_or(Scalar::Null),
        DataType::Float64 => cell.parse().map(Scalar::F64).unwrap_or(Scalar::Null),
        _ => Scalar::Str(cell.to_string()),
    }
}

pub fn read_csv(path: &Path, chunk_rows: usize) -> Result<LoadedTable, Box<dyn std::error::Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let records = reader.records().collect::<Result<Vec<_>, _>>()?;

    let schema = Schema::new(
        names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let (ty, nullable) =
                    infer_type(records.iter().map(|r| r.get(col).unwrap_or("")));
                Field::new(name.clone(), ty, nullable)
            })
            .collect(),
    );
    let types = schema.types();

    let empty_chunk = || {
        RowBatch::new(
            names
                .iter()
                .map(|n| Column::new(n.clone(), Vec::new()))
                .collect(),
        )
    };
    let mut chunks = Vec::new();
    for group in records.chunks(chunk_rows.max(1)) {
        let mut chunk = empty_chunk();
        for record in group {
            chunk.push_row(
                types
                    .iter()
                    .enumerate()
                    .map(|(col, ty)| to_scalar(record.get(col).unwrap_or(""), *ty)),
            )?;
        }
        chunks.push(chunk);
    }
    if chunks.is_empty() {
        chunks.push(empty_chunk());
    }
    Ok(LoadedTable { schema, chunks })
}

impl LoadedTable {
    pub fn key_index(&self, key: &str) -> Result<usize, String> {
        self.schema
            .index_of(key)
            .ok_or_else(|| format!("no column named {}", key))
    }

    pub fn key_type(&self, idx: usize) -> Option<DataType> {
        self.schema.field(idx).map(|f| f.data_type)
    }

    /// All chunks as one batch.
    pub fn concat(&self) -> Result<RowBatch, joinadapt_core::Error> {
        let mut all = RowBatch::default();
        for chunk in &self.chunks {
            all.append(chunk.clone())?;
        }
        Ok(all)
    }
}
