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

use crate::config::ProfilingConfigSection;
use crate::frame::{Column, ColumnData, DataFrame, DataType, Scalar};
use crate::stats::{self, round_to};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

const TOP_VALUE_COUNTS: usize = 10;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Per-column profile. `is_categorical` drives every chart compatibility check.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "dtype")]
    pub data_type: DataType,
    pub is_numeric: bool,
    pub is_temporal: bool,
    pub is_categorical: bool,
    pub null_count: usize,
    pub null_percentage: f64,
    pub unique_count: usize,
    pub sample_values: Vec<Scalar>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchemaProfile {
    #[serde(rename = "columns")]
    pub column_profiles: Vec<ColumnProfile>,
    pub row_count: usize,
    pub column_count: usize,
    /// Approximate in-memory size in megabytes.
    pub memory_estimate: f64,
}

impl SchemaProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.column_profiles.iter().find(|p| p.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.column_profiles.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub median: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueCounts {
    pub column: String,
    pub counts: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatistics {
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<ValueCounts>,
}

#[derive(Debug, Clone)]
pub struct SchemaAnalyzer {
    sample_size: usize,
    categorical_max_unique: usize,
    categorical_ratio: f64,
}

impl SchemaAnalyzer {
    pub fn new() -> Self {
        Self::from_config(&ProfilingConfigSection::default())
    }

    pub fn from_config(config: &ProfilingConfigSection) -> Self {
        Self {
            sample_size: config.sample_size,
            categorical_max_unique: config.categorical_max_unique,
            categorical_ratio: config.categorical_ratio,
        }
    }

    /// Profiles every column. Never fails; an empty frame yields zeroed statistics.
    pub fn profile(&self, df: &DataFrame) -> SchemaProfile {
        let row_count = df.row_count();
        let column_profiles: Vec<ColumnProfile> = df
            .column_names()
            .par_iter()
            .filter_map(|name| {
                df.get_column(name)
                    .map(|column| self.profile_column(name, column, row_count))
            })
            .collect();
        debug!(
            "Profiled {} columns over {} rows",
            column_profiles.len(),
            row_count
        );
        SchemaProfile {
            column_count: column_profiles.len(),
            column_profiles,
            row_count,
            memory_estimate: round_to(df.memory_estimate_bytes() as f64 / BYTES_PER_MB, 2),
        }
    }

    pub fn profile_column(&self, name: &str, column: &Column, row_count: usize) -> ColumnProfile {
        let data_type = column.data_type();
        let null_count = column.null_count();
        let null_percentage = if row_count == 0 {
            0.0
        } else {
            round_to(null_count as f64 / row_count as f64 * 100.0, 2)
        };
        let unique_count = column.unique_count();
        ColumnProfile {
            name: name.to_string(),
            data_type,
            is_numeric: data_type.is_numeric(),
            is_temporal: data_type.is_temporal(),
            is_categorical: self.is_categorical(data_type, unique_count, row_count),
            null_count,
            null_percentage,
            unique_count,
            sample_values: column
                .scalars()
                .filter(|v| !v.is_null())
                .take(self.sample_size)
                .collect(),
        }
    }

    /// Textual columns are always categorical; others when their distinct
    /// count stays under `min(categorical_max_unique, ratio * rows)`.
    pub fn is_categorical(&self, data_type: DataType, unique_count: usize, row_count: usize) -> bool {
        let threshold =
            (self.categorical_max_unique as f64).min(self.categorical_ratio * row_count as f64);
        data_type.is_textual() || (unique_count as f64) < threshold
    }

    /// Describe-style summaries for numeric columns and top value counts for the rest.
    pub fn statistics(&self, df: &DataFrame) -> DatasetStatistics {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();
        for name in df.column_names() {
            let Some(column) = df.get_column(name) else {
                continue;
            };
            if column.data_type().is_numeric() {
                numeric.push(numeric_summary(name, column));
            } else {
                categorical.push(value_counts(name, column, TOP_VALUE_COUNTS));
            }
        }
        DatasetStatistics {
            numeric,
            categorical,
        }
    }
}

impl Default for SchemaAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric_summary(name: &str, column: &Column) -> NumericSummary {
    let values = column.numeric_values();
    let quartiles = (!values.is_empty()).then(|| stats::Quartiles::of(&values));
    NumericSummary {
        column: name.to_string(),
        count: values.len(),
        mean: stats::mean(&values),
        std: stats::sample_std(&values),
        min: quartiles.map(|q| q.min),
        q25: quartiles.map(|q| q.q1),
        median: quartiles.map(|q| q.median),
        q75: quartiles.map(|q| q.q3),
        max: quartiles.map(|q| q.max),
    }
}

/// Most frequent values, ties in first-seen order.
fn value_counts(name: &str, column: &Column, limit: usize) -> ValueCounts {
    let mut first_seen: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.scalars().filter_map(|v| v.render()) {
        let count = counts.entry(value.clone()).or_insert(0);
        if *count == 0 {
            first_seen.push(value);
        }
        *count += 1;
    }
    let mut ordered: Vec<(String, usize)> = first_seen
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            (value, count)
        })
        .collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered.truncate(limit);
    ValueCounts {
        column: name.to_string(),
        counts: ordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorical_threshold_uses_row_ratio() {
        let analyzer = SchemaAnalyzer::new();
        assert!(analyzer.is_categorical(DataType::String, 1000, 1000));
        // min(50, 0.1 * 100) = 10
        assert!(analyzer.is_categorical(DataType::Int64, 9, 100));
        assert!(!analyzer.is_categorical(DataType::Int64, 10, 100));
        // min(50, 0.1 * 1000) = 50
        assert!(analyzer.is_categorical(DataType::Float64, 49, 1000));
        assert!(!analyzer.is_categorical(DataType::Float64, 50, 1000));
        assert!(!analyzer.is_categorical(DataType::Int64, 0, 0));
    }

    #[test]
    fn value_counts_order_by_frequency_then_first_seen() {
        let column = Column::from(vec![Some("b"), Some("a"), Some("a"), Some("c"), Some("b"), None]);
        let counts = value_counts("x", &column, 2);
        assert_eq!(counts.counts, vec![("b".to_string(), 2), ("a".to_string(), 2)]);
    }
}
