//! Reads a records file into a raw, untyped table.
//!
//! Only `.csv` and `.json` sources are recognised. The extension is checked
//! before the file is opened so unsupported inputs fail fast.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Source column names plus rows aligned with them. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<SourceFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "json" => Some(SourceFormat::Json),
            _ => None,
        }
    }
}

pub fn load_source(path: &Path) -> Result<RawTable> {
    let format = SourceFormat::from_path(path).ok_or_else(|| {
        PipelineError::format(path, "file format not supported (only .csv or .json)")
    })?;

    let table = match format {
        SourceFormat::Csv => read_csv(path)?,
        SourceFormat::Json => read_json(path)?,
    };

    if table.columns.iter().all(|name| name.trim().is_empty()) {
        return Err(PipelineError::format(path, "source has no header columns"));
    }

    debug!(
        path = %path.display(),
        columns = table.columns.len(),
        rows = table.rows.len(),
        "Loaded source table"
    );
    Ok(table)
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::format(path, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::format(path, e))?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| PipelineError::format(path, e))?;
        let row = (0..columns.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

fn read_json(path: &Path) -> Result<RawTable> {
    let file = File::open(path).map_err(|e| PipelineError::format(path, e))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PipelineError::format(path, e))?;

    let Value::Array(items) = value else {
        return Err(PipelineError::format(
            path,
            "expected a JSON array of row objects",
        ));
    };

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut objects = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(PipelineError::format(
                path,
                format!("row {index} is not a JSON object"),
            ));
        };
        for key in object.keys() {
            if !positions.contains_key(key) {
                positions.insert(key.clone(), columns.len());
                columns.push(key.clone());
            }
        }
        objects.push(object);
    }

    let mut rows = Vec::with_capacity(objects.len());
    for (index, object) in objects.into_iter().enumerate() {
        let mut row = vec![String::new(); columns.len()];
        for (key, value) in object {
            let text = scalar_to_text(&value).ok_or_else(|| {
                PipelineError::format(
                    path,
                    format!("row {index} column '{key}' is not a scalar value"),
                )
            })?;
            row[positions[&key]] = text;
        }
        rows.push(row);
    }

    Ok(RawTable { columns, rows })
}

fn scalar_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) => Some(text.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}
