//! Persisted tables
//!
//! Every table is a list of flat JSON rows, stored either as newline-delimited
//! JSON (one row per line) or as a single JSON array. The format is chosen by
//! file extension when reading.

use crate::error::ComputeError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk row format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Newline-delimited JSON
    #[default]
    Ndjson,
    /// JSON array of rows
    Json,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Ndjson => "ndjson",
            TableFormat::Json => "json",
        }
    }

    /// Format implied by a file's extension, if it is a table file
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ndjson" | "jsonl" => Some(TableFormat::Ndjson),
            "json" => Some(TableFormat::Json),
            _ => None,
        }
    }
}

/// Parse newline-delimited JSON rows, skipping blank lines
pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, ComputeError> {
    let mut rows = Vec::new();
    for (line_num, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(trimmed) {
            Ok(row) => rows.push(row),
            Err(e) => {
                return Err(ComputeError::ParseError(format!(
                    "Failed to parse line {}: {}",
                    line_num + 1,
                    e
                )));
            }
        }
    }
    Ok(rows)
}

/// Parse a JSON array of rows
pub fn parse_array<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, ComputeError> {
    Ok(serde_json::from_str(json)?)
}

/// Render rows in the given format
pub fn render<T: Serialize>(rows: &[T], format: TableFormat) -> Result<String, ComputeError> {
    match format {
        TableFormat::Ndjson => {
            let mut out = String::new();
            for row in rows {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
            Ok(out)
        }
        TableFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
    }
}

/// Read one table file; the extension picks the format (NDJSON otherwise)
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ComputeError> {
    let content = fs::read_to_string(path)?;
    let parsed = match TableFormat::from_path(path).unwrap_or_default() {
        TableFormat::Ndjson => parse_ndjson(&content),
        TableFormat::Json => parse_array(&content),
    };
    parsed.map_err(|e| match e {
        ComputeError::ParseError(msg) => {
            ComputeError::ParseError(format!("{}: {}", path.display(), msg))
        }
        ComputeError::JsonError(e) => {
            ComputeError::ParseError(format!("{}: {}", path.display(), e))
        }
        other => other,
    })
}

/// Write `<dir>/<name>.<ext>`, creating `dir` if needed
pub fn write_table<T: Serialize>(
    dir: &Path,
    name: &str,
    rows: &[T],
    format: TableFormat,
) -> Result<PathBuf, ComputeError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", name, format.extension()));
    fs::write(&path, render(rows, format)?)?;
    Ok(path)
}

/// Table files directly under `dir`, sorted by file name.
///
/// A missing directory holds no tables.
pub fn list_tables(dir: &Path) -> Result<Vec<PathBuf>, ComputeError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && TableFormat::from_path(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Concatenate every table under `dir` in file-name order
pub fn load_cohort_table<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, ComputeError> {
    let mut rows = Vec::new();
    for path in list_tables(dir)? {
        rows.extend(read_table::<T>(&path)?);
    }
    Ok(rows)
}

/// Concatenate `<dir>/<name>.<ext>` for each of `names`, in the order given.
///
/// Every named table must exist; other files under `dir` are not read.
pub fn load_named_tables<T: DeserializeOwned>(
    dir: &Path,
    names: &[&str],
    format: TableFormat,
) -> Result<Vec<T>, ComputeError> {
    let mut rows = Vec::new();
    for name in names {
        let path = dir.join(format!("{}.{}", name, format.extension()));
        if !path.is_file() {
            return Err(ComputeError::MalformedInput(format!(
                "missing table {}",
                path.display()
            )));
        }
        rows.extend(read_table::<T>(&path)?);
    }
    Ok(rows)
}

/// Animal name of a per-animal file (its stem)
pub fn animal_name(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}
