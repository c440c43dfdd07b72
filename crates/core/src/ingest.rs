//! Replays records exported from upstream search APIs.

use crate::normalize::normalize;
use crate::traits::SourceAdapter;
use crate::{IngestError, RawRecord, SourceTag};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const RECORD_EXTENSIONS: [&str; 4] = ["json", "jsonl", "ndjson", "csv"];

pub fn discover_record_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_record_file = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                RECORD_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_record_file {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Loads records from a file or, recursively, from every record file in a folder.
///
/// `.json` files hold an array of objects or a single object; `.jsonl` and
/// `.ndjson` files hold one object per non-blank line; `.csv` files are
/// scraped article tables read by [`load_csv_records`].
pub fn load_records(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    if path.is_dir() {
        let files = discover_record_files(path);
        if files.is_empty() {
            return Err(IngestError::InvalidArgument(format!(
                "no record files found in {}",
                path.display()
            )));
        }

        let mut records = Vec::new();
        for file in files {
            records.extend(load_record_file(&file)?);
        }
        return Ok(records);
    }

    load_record_file(path)
}

fn load_record_file(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if extension == "csv" {
        return load_csv_records(path);
    }

    let content = fs::read_to_string(path)?;
    let line_delimited = extension == "jsonl" || extension == "ndjson";

    if line_delimited {
        return content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                let value: Value = serde_json::from_str(line)?;
                into_record(value, path, Some(number + 1))
            })
            .collect();
    }

    match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| into_record(item, path, None))
            .collect(),
        other => Ok(vec![into_record(other, path, None)?]),
    }
}

/// Reads a scraped article table with `title`, `url`, `metadata`, `content`
/// and `section` columns (matched case-insensitively, any order).
///
/// Each row becomes one record: `content` is the abstract, the lower-cased
/// `section` is the single keyword, and `year` is the year of the import.
pub fn load_csv_records(path: &Path) -> Result<Vec<RawRecord>, IngestError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    };
    let (title, url, metadata, content, section) = (
        position("title"),
        position("url"),
        position("metadata"),
        position("content"),
        position("section"),
    );
    if content.is_none() {
        return Err(IngestError::InvalidArgument(format!(
            "{} has no content column",
            path.display()
        )));
    }

    let year = Utc::now().year();
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |column: Option<usize>| {
            column
                .and_then(|index| row.get(index))
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        let topic = cell(section).to_lowercase();
        let keywords = if topic.is_empty() { Vec::new() } else { vec![topic] };

        let mut record = RawRecord::new();
        record.insert("title".to_string(), Value::from(cell(title)));
        record.insert("url".to_string(), Value::from(cell(url)));
        record.insert("metadata".to_string(), Value::from(cell(metadata)));
        record.insert("abstract".to_string(), Value::from(cell(content)));
        record.insert("keywords".to_string(), json!(keywords));
        record.insert("year".to_string(), Value::from(year));
        records.push(record);
    }

    Ok(records)
}

fn into_record(value: Value, path: &Path, line: Option<usize>) -> Result<RawRecord, IngestError> {
    match value {
        Value::Object(record) => Ok(record),
        other => {
            let location = match line {
                Some(line) => format!("{}:{line}", path.display()),
                None => path.display().to_string(),
            };
            Err(IngestError::InvalidArgument(format!(
                "expected a JSON object in {location}, found {}",
                json_kind(&other)
            )))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Source adapter over a previously exported search result.
///
/// The export already reflects the upstream query, so `query` is not
/// interpreted. Records keep file order, are capped at `max_results`, and are
/// dropped when their normalized year is known and outside `year_range`.
pub struct RecordFileSource {
    path: PathBuf,
    source: SourceTag,
}

impl RecordFileSource {
    pub fn new(path: impl Into<PathBuf>, source: SourceTag) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[async_trait]
impl SourceAdapter for RecordFileSource {
    fn source(&self) -> SourceTag {
        self.source
    }

    async fn search(
        &self,
        _query: &str,
        max_results: usize,
        year_range: (u32, u32),
    ) -> Result<Vec<RawRecord>, IngestError> {
        let (from, to) = year_range;
        if from > to {
            return Err(IngestError::InvalidArgument(format!(
                "year range {from}..={to} is empty"
            )));
        }

        let mut records: Vec<RawRecord> = load_records(&self.path)?
            .into_iter()
            .filter(|record| {
                let year = normalize(record, self.source).year;
                year == 0 || (from..=to).contains(&year)
            })
            .collect();

        if records.len() > max_results {
            info!(
                path = %self.path.display(),
                kept = max_results,
                dropped = records.len() - max_results,
                "record limit reached"
            );
            records.truncate(max_results);
        }
        Ok(records)
    }
}
