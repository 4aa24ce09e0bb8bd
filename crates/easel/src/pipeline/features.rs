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

use crate::error::{PipelineError, PipelineResult};
use crate::frame::{Column, ColumnData, DataFrame};
use crate::pipeline::{PipelineSettings, StepOutcome};
use crate::recommendation::{BinSpec, FeatureOperation, FeatureSpec};
use crate::stats::round_to;
use chrono::{Datelike, NaiveDateTime};
use tracing::debug;

/// Share of the value range the lowest edge is pushed out by, so the
/// minimum lands inside the first right-closed bin.
const EDGE_ADJUSTMENT: f64 = 0.001;
const LABEL_PRECISION: i32 = 3;

pub fn apply_feature(
    df: &DataFrame,
    spec: &FeatureSpec,
    settings: &PipelineSettings,
) -> PipelineResult<StepOutcome> {
    let new = spec.new_column_name.as_str();
    if new.trim().is_empty() {
        return Err(PipelineError::InvalidParameters(
            "new_column_name must not be empty".into(),
        ));
    }
    let sources = spec
        .source_columns
        .iter()
        .map(|name| {
            df.get_column(name)
                .map(|column| (name.as_str(), column))
                .ok_or_else(|| PipelineError::ColumnNotFound(name.clone()))
        })
        .collect::<PipelineResult<Vec<_>>>()?;
    let (first_name, first) = match sources.first() {
        Some(source) => *source,
        None => {
            return Err(PipelineError::InvalidParameters(format!(
                "{} requires at least one source column",
                spec.operation
            )))
        }
    };

    let (column, entry) = match &spec.operation {
        FeatureOperation::ExtractYear => (
            date_part(first, settings, |dt| i64::from(dt.year())),
            format!("Created '{new}' by extracting year from '{first_name}'"),
        ),
        FeatureOperation::ExtractMonth => (
            date_part(first, settings, |dt| i64::from(dt.month())),
            format!("Created '{new}' by extracting month from '{first_name}'"),
        ),
        FeatureOperation::ExtractDay => (
            date_part(first, settings, |dt| i64::from(dt.day())),
            format!("Created '{new}' by extracting day from '{first_name}'"),
        ),
        FeatureOperation::Concatenate => {
            if sources.len() < 2 {
                return Err(PipelineError::InvalidParameters(
                    "concatenate requires at least two source columns".into(),
                ));
            }
            (
                concatenate(df.row_count(), &sources),
                format!("Created '{new}' by concatenating {:?}", spec.source_columns),
            )
        }
        FeatureOperation::Sum => (
            row_sum(df.row_count(), &sources)?,
            format!("Created '{new}' as sum of {:?}", spec.source_columns),
        ),
        FeatureOperation::Average => (
            row_average(df.row_count(), &sources)?,
            format!("Created '{new}' as average of {:?}", spec.source_columns),
        ),
        FeatureOperation::BinNumeric { bins, labels } => {
            require_numeric(first_name, first)?;
            let spec_bins = bins
                .clone()
                .unwrap_or(BinSpec::Count(settings.default_bins));
            let edges = match &spec_bins {
                BinSpec::Count(count) => equal_width_edges(&first.numeric_values(), *count)?,
                BinSpec::Edges(edges) => validated_edges(edges)?,
            };
            let bin_count = edges.len() - 1;
            (
                bucketize(first, &edges, labels.as_deref())?,
                format!("Created '{new}' by binning '{first_name}' into {bin_count} bins"),
            )
        }
        FeatureOperation::Categorize { bins, labels } => {
            require_numeric(first_name, first)?;
            let edges = validated_edges(bins)?;
            (
                bucketize(first, &edges, Some(labels.as_slice()))?,
                format!("Created '{new}' by categorizing '{first_name}'"),
            )
        }
    };

    let mut next = df.clone();
    next.add_column(new.to_string(), column)?;
    Ok(StepOutcome::Applied(next, entry))
}

fn require_numeric(name: &str, column: &Column) -> PipelineResult<()> {
    if column.data_type().is_numeric() {
        Ok(())
    } else {
        Err(PipelineError::NotNumeric {
            column: name.to_string(),
        })
    }
}

/// Unparseable values become null.
fn date_part<F>(column: &Column, settings: &PipelineSettings, part: F) -> Column
where
    F: Fn(&NaiveDateTime) -> i64,
{
    match column.to_datetime(&settings.temporal_formats) {
        Column::Datetime(values) => {
            Column::Int64(values.iter().map(|v| v.as_ref().map(&part)).collect())
        }
        _ => Column::nulls(crate::frame::DataType::Int64, column.len()),
    }
}

/// Nulls render as empty text.
fn concatenate(rows: usize, sources: &[(&str, &Column)]) -> Column {
    Column::from(
        (0..rows)
            .map(|i| {
                let parts: Vec<String> = sources
                    .iter()
                    .map(|(_, column)| column.get_string(i).unwrap_or_default())
                    .collect();
                Some(parts.join(" "))
            })
            .collect::<Vec<_>>(),
    )
}

fn numeric_sources(sources: &[(&str, &Column)]) -> PipelineResult<()> {
    sources
        .iter()
        .try_for_each(|(name, column)| require_numeric(name, column))
}

/// Nulls are skipped; a row with no values sums to zero. Integer sources
/// give an integer column unless a row overflows `i64`, in which case the
/// whole column is summed as floats.
fn row_sum(rows: usize, sources: &[(&str, &Column)]) -> PipelineResult<Column> {
    numeric_sources(sources)?;
    let all_integer = sources
        .iter()
        .all(|(_, column)| matches!(column, Column::Int64(_)));
    if all_integer {
        let sums: Option<Vec<Option<i64>>> = (0..rows)
            .map(|i| {
                sources
                    .iter()
                    .filter_map(|(_, column)| match column {
                        Column::Int64(data) => data.get(i).copied().flatten(),
                        _ => None,
                    })
                    .try_fold(0i64, i64::checked_add)
                    .map(Some)
            })
            .collect();
        match sums {
            Some(sums) => return Ok(Column::from(sums)),
            None => debug!("Integer sum overflowed; summing as floats"),
        }
    }
    Ok(Column::from(
        (0..rows)
            .map(|i| Some(sources.iter().filter_map(|(_, c)| c.to_f64(i)).sum::<f64>()))
            .collect::<Vec<_>>(),
    ))
}

/// Mean of the non-null values in each row; null when the row has none.
fn row_average(rows: usize, sources: &[(&str, &Column)]) -> PipelineResult<Column> {
    numeric_sources(sources)?;
    Ok(Column::from(
        (0..rows)
            .map(|i| {
                let values: Vec<f64> = sources.iter().filter_map(|(_, c)| c.to_f64(i)).collect();
                crate::stats::mean(&values)
            })
            .collect::<Vec<_>>(),
    ))
}

/// `count + 1` evenly spaced edges over the value range.
fn equal_width_edges(values: &[f64], count: usize) -> PipelineResult<Vec<f64>> {
    if count == 0 {
        return Err(PipelineError::InvalidParameters(
            "bins must be at least 1".into(),
        ));
    }
    let (min, max) = values
        .iter()
        .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .ok_or_else(|| PipelineError::InvalidParameters("no non-null values to bin".into()))?;
    if min == max {
        let pad = if min == 0.0 { EDGE_ADJUSTMENT } else { min.abs() * EDGE_ADJUSTMENT };
        let (lo, hi) = (min - pad, max + pad);
        let step = (hi - lo) / count as f64;
        return Ok((0..=count).map(|k| lo + step * k as f64).collect());
    }
    let step = (max - min) / count as f64;
    let mut edges: Vec<f64> = (0..=count).map(|k| min + step * k as f64).collect();
    edges[count] = max;
    edges[0] -= (max - min) * EDGE_ADJUSTMENT;
    Ok(edges)
}

fn validated_edges(edges: &[f64]) -> PipelineResult<Vec<f64>> {
    if edges.len() < 2 {
        return Err(PipelineError::InvalidParameters(
            "bins must list at least two edges".into(),
        ));
    }
    if edges.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(PipelineError::InvalidParameters(
            "bins must increase monotonically".into(),
        ));
    }
    Ok(edges.to_vec())
}

fn format_edge(value: f64) -> String {
    let rounded = round_to(value, LABEL_PRECISION);
    if rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        rounded.to_string()
    }
}

/// Assigns each value to the right-closed interval `(edges[k], edges[k + 1]]`
/// it falls in. Values outside every interval become null.
fn bucketize(column: &Column, edges: &[f64], labels: Option<&[String]>) -> PipelineResult<Column> {
    let bin_count = edges.len() - 1;
    let names: Vec<String> = match labels {
        Some(labels) if labels.len() != bin_count => {
            return Err(PipelineError::InvalidParameters(format!(
                "expected {bin_count} labels for {bin_count} bins, got {}",
                labels.len()
            )))
        }
        Some(labels) => labels.to_vec(),
        None => edges
            .windows(2)
            .map(|pair| format!("({}, {}]", format_edge(pair[0]), format_edge(pair[1])))
            .collect(),
    };
    Ok(Column::from(
        (0..column.len())
            .map(|i| {
                column.to_f64(i).and_then(|v| {
                    edges
                        .windows(2)
                        .position(|pair| v > pair[0] && v <= pair[1])
                        .map(|k| names[k].clone())
                })
            })
            .collect::<Vec<_>>(),
    ))
}
