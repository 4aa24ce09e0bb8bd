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

//! Pre-flight checks on datasets and uploads.

use crate::frame::{ColumnData, DataFrame};
use serde::{Deserialize, Serialize};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDataValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Missing axis columns are errors; nulls and non-numeric y columns are
/// warnings only.
pub fn validate_chart_data<S: AsRef<str>>(
    df: &DataFrame,
    x_axis: &str,
    y_axes: &[S],
) -> ChartDataValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match df.get_column(x_axis) {
        None => errors.push(format!("X-axis column '{x_axis}' not found")),
        Some(column) => {
            let nulls = column.null_count();
            if nulls > 0 {
                warnings.push(format!("X-axis column '{x_axis}' has {nulls} null values"));
            }
        }
    }

    for y in y_axes.iter().map(AsRef::as_ref) {
        let Some(column) = df.get_column(y) else {
            errors.push(format!("Y-axis column '{y}' not found"));
            continue;
        };
        let nulls = column.null_count();
        if nulls > 0 {
            warnings.push(format!("Y-axis column '{y}' has {nulls} null values"));
        }
        if !column.data_type().is_numeric() {
            warnings.push(format!("Y-axis column '{y}' is not numeric"));
        }
    }

    ChartDataValidation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

pub fn validate_file_size(size_bytes: u64, max_size_mb: u64) -> bool {
    size_bytes <= max_size_mb.saturating_mul(BYTES_PER_MB)
}

/// Compares the text after the last dot, case-insensitively.
pub fn validate_file_extension<S: AsRef<str>>(filename: &str, allowed: &[S]) -> bool {
    let extension = filename.rsplit('.').next().unwrap_or_default().to_lowercase();
    allowed.iter().any(|a| a.as_ref().eq_ignore_ascii_case(&extension))
}

/// Share of null cells in a column, 0..=1. Missing or empty columns fail.
pub fn validate_not_null(df: &DataFrame, column: &str, threshold: f64) -> bool {
    match df.get_column(column) {
        Some(c) if !c.is_empty() => (c.null_count() as f64 / c.len() as f64) <= threshold,
        _ => false,
    }
}

pub fn validate_unique_values(
    df: &DataFrame,
    column: &str,
    min_unique: Option<usize>,
    max_unique: Option<usize>,
) -> bool {
    let Some(c) = df.get_column(column) else {
        return false;
    };
    let unique = c.unique_count();
    min_unique.map_or(true, |min| min <= unique) && max_unique.map_or(true, |max| unique <= max)
}
