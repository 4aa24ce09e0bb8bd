// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Dataset loading and export.

use crate::config::EaselConfig;
use crate::error::{LoadError, LoadResult};
use crate::frame::{
    ColumnBuilder, ColumnData, DataFrame, DatasetMetadata, DATETIME_RENDER_FORMAT,
    DEFAULT_TEMPORAL_FORMATS,
};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use tracing::{debug, info};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Excel,
    Json,
}

impl FileFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "xlsx" | "xls" => Some(FileFormat::Excel),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

pub fn infer_file_type(filename: &str) -> Option<FileFormat> {
    file_extension(filename).and_then(|ext| FileFormat::from_extension(&ext))
}

/// Checks an upload against the configured extension list and size limit.
pub fn validate_upload(config: &EaselConfig, filename: &str, size_bytes: u64) -> LoadResult<FileFormat> {
    let extension = file_extension(filename).unwrap_or_default();
    if !config.is_allowed_extension(&extension) {
        return Err(LoadError::NotAllowed {
            extension,
            allowed: config.limits.allowed_file_types.join(", "),
        });
    }
    if size_bytes > config.max_file_size_bytes() {
        return Err(LoadError::TooLarge {
            size_mb: size_bytes as f64 / BYTES_PER_MB,
            limit_mb: config.limits.max_file_size_mb,
        });
    }
    FileFormat::from_extension(&extension).ok_or(LoadError::Unsupported { extension })
}

/// Builds a dataset from raw file bytes.
pub trait DatasetLoader {
    fn load(&self, bytes: &[u8], dataset_name: &str) -> LoadResult<DataFrame>;
}

/// Repeated names get `.1`, `.2`, ... appended, skipping names already taken.
fn deduplicate_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|name| {
            if taken.insert(name.clone()) {
                return name;
            }
            let suffix = suffixes.entry(name.clone()).or_insert(0);
            loop {
                *suffix += 1;
                let candidate = format!("{name}.{suffix}");
                if taken.insert(candidate.clone()) {
                    debug!("Renamed duplicate column '{name}' to '{candidate}'");
                    return candidate;
                }
            }
        })
        .collect()
}

fn assemble(
    dataset_name: &str,
    headers: Vec<String>,
    builders: Vec<ColumnBuilder>,
) -> LoadResult<DataFrame> {
    let mut df = DataFrame::new(DatasetMetadata::named(dataset_name));
    for (name, builder) in deduplicate_headers(headers).into_iter().zip(builders) {
        df.add_column(name, builder.build())?;
    }
    Ok(df)
}

#[derive(Debug, Clone)]
pub struct CsvReader {
    delimiter: u8,
    has_headers: bool,
    temporal_formats: Vec<String>,
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            temporal_formats: DEFAULT_TEMPORAL_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_temporal_formats(mut self, formats: Vec<String>) -> Self {
        self.temporal_formats = formats;
        self
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader for CsvReader {
    /// Short rows are padded with nulls; rows wider than the header fail.
    fn load(&self, bytes: &[u8], dataset_name: &str) -> LoadResult<DataFrame> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);
        let mut records = reader.records();

        let first = match records.next() {
            Some(record) => record?,
            None => return Err(LoadError::Empty(dataset_name.to_string())),
        };
        let (headers, pending) = if self.has_headers {
            (first.iter().map(|h| h.trim().to_string()).collect::<Vec<_>>(), None)
        } else {
            ((0..first.len()).map(|i| format!("column_{i}")).collect(), Some(first))
        };
        if headers.is_empty() {
            return Err(LoadError::Empty(dataset_name.to_string()));
        }

        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|_| ColumnBuilder::with_temporal_formats(self.temporal_formats.clone()))
            .collect();
        let mut line = if self.has_headers { 1 } else { 0 };
        for record in pending.into_iter().map(Ok::<_, csv::Error>).chain(records) {
            let record = record?;
            line += 1;
            if record.len() > headers.len() {
                return Err(LoadError::Malformed(format!(
                    "line {line}: expected {} fields, got {}",
                    headers.len(),
                    record.len()
                )));
            }
            for (i, builder) in builders.iter_mut().enumerate() {
                builder.push(record.get(i).map(str::to_string));
            }
        }
        let df = assemble(dataset_name, headers, builders)?;
        debug!("Parsed CSV '{}': {} rows", dataset_name, df.row_count());
        Ok(df)
    }
}

/// Reads a JSON array of flat records. Columns appear in first-seen key
/// order; keys missing from a record read as null.
#[derive(Debug, Clone)]
pub struct JsonReader {
    temporal_formats: Vec<String>,
}

impl JsonReader {
    pub fn new() -> Self {
        Self {
            temporal_formats: DEFAULT_TEMPORAL_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_temporal_formats(mut self, formats: Vec<String>) -> Self {
        self.temporal_formats = formats;
        self
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl DatasetLoader for JsonReader {
    fn load(&self, bytes: &[u8], dataset_name: &str) -> LoadResult<DataFrame> {
        let document: Value = serde_json::from_slice(bytes)?;
        let Value::Array(rows) = document else {
            return Err(LoadError::Malformed(
                "expected a JSON array of records".to_string(),
            ));
        };
        if rows.is_empty() {
            return Err(LoadError::Empty(dataset_name.to_string()));
        }

        let mut headers: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            let Value::Object(record) = row else {
                return Err(LoadError::Malformed(format!(
                    "record {index} is not a JSON object"
                )));
            };
            for key in record.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), headers.len());
                    headers.push(key.clone());
                }
            }
        }

        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|_| ColumnBuilder::with_temporal_formats(self.temporal_formats.clone()))
            .collect();
        for row in &rows {
            for (name, builder) in headers.iter().zip(builders.iter_mut()) {
                builder.push(row.get(name).and_then(cell_text));
            }
        }
        let df = assemble(dataset_name, headers, builders)?;
        debug!("Parsed JSON '{}': {} rows", dataset_name, df.row_count());
        Ok(df)
    }
}

/// Reads the first worksheet of an xlsx or xls workbook. The first row holds
/// the headers; cells are typed by the same inference as CSV text.
#[derive(Debug, Clone)]
pub struct ExcelReader {
    temporal_formats: Vec<String>,
}

impl ExcelReader {
    pub fn new() -> Self {
        Self {
            temporal_formats: DEFAULT_TEMPORAL_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_temporal_formats(mut self, formats: Vec<String>) -> Self {
        self.temporal_formats = formats;
        self
    }
}

impl Default for ExcelReader {
    fn default() -> Self {
        Self::new()
    }
}

fn excel_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|value| value.format(DATETIME_RENDER_FORMAT).to_string()),
    }
}

impl DatasetLoader for ExcelReader {
    fn load(&self, bytes: &[u8], dataset_name: &str) -> LoadResult<DataFrame> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .map_err(|e| LoadError::Malformed(format!("Excel: {e}")))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::Empty(dataset_name.to_string()))?
            .map_err(|e| LoadError::Malformed(format!("Excel: {e}")))?;
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Err(LoadError::Empty(dataset_name.to_string()));
        };
        let headers: Vec<String> = header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match excel_cell_text(cell) {
                Some(name) if !name.trim().is_empty() => name.trim().to_string(),
                _ => format!("column_{i}"),
            })
            .collect();

        let mut builders: Vec<ColumnBuilder> = headers
            .iter()
            .map(|_| ColumnBuilder::with_temporal_formats(self.temporal_formats.clone()))
            .collect();
        for row in rows {
            for (i, builder) in builders.iter_mut().enumerate() {
                builder.push(row.get(i).and_then(excel_cell_text));
            }
        }
        let df = assemble(dataset_name, headers, builders)?;
        debug!("Parsed workbook '{}': {} rows", dataset_name, df.row_count());
        Ok(df)
    }
}

/// Dispatches on the file extension.
pub fn load_bytes(
    bytes: &[u8],
    extension: &str,
    dataset_name: &str,
    temporal_formats: &[String],
) -> LoadResult<DataFrame> {
    let format = FileFormat::from_extension(extension).ok_or_else(|| LoadError::Unsupported {
        extension: extension.to_string(),
    })?;
    match format {
        FileFormat::Csv => CsvReader::new()
            .with_temporal_formats(temporal_formats.to_vec())
            .load(bytes, dataset_name),
        FileFormat::Json => JsonReader::new()
            .with_temporal_formats(temporal_formats.to_vec())
            .load(bytes, dataset_name),
        FileFormat::Excel => ExcelReader::new()
            .with_temporal_formats(temporal_formats.to_vec())
            .load(bytes, dataset_name),
    }
}

/// Reads a file from disk after checking it against the configured limits.
pub fn load_path(path: &Path, config: &EaselConfig) -> LoadResult<DataFrame> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let size = std::fs::metadata(path)?.len();
    validate_upload(config, &filename, size)?;
    let bytes = std::fs::read(path)?;
    let extension = file_extension(&filename).unwrap_or_default();
    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("dataset");
    let df = load_bytes(&bytes, &extension, name, &config.profiling.temporal_formats)?;
    info!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        df.row_count(),
        df.column_count()
    );
    Ok(df)
}

#[derive(Debug, Clone)]
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Nulls are written as empty fields; datetimes in ISO-8601.
    pub fn write<W: Write>(&self, df: &DataFrame, sink: W) -> LoadResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(sink);
        writer.write_record(df.column_names())?;
        let columns: Vec<_> = df
            .column_names()
            .iter()
            .filter_map(|name| df.get_column(name))
            .collect();
        for row in 0..df.row_count() {
            writer.write_record(
                columns
                    .iter()
                    .map(|column| column.get_string(row).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_file(&self, df: &DataFrame, path: &Path) -> LoadResult<()> {
        let file = File::create(path)?;
        self.write(df, BufWriter::new(file))?;
        debug!("Wrote {} rows to {}", df.row_count(), path.display());
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
