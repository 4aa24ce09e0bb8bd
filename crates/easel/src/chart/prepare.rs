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

//! Reshapes a dataset into the record layout each chart family renders.

use crate::chart::types::ChartType;
use crate::error::{ChartError, ChartResult};
use crate::frame::{Column, ColumnData, DataFrame, DataType, Record, Scalar};
use crate::stats::Quartiles;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Column name to required value, or to a list of accepted values.
pub type ChartFilters = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub chart_type: ChartType,
    pub x_axis: String,
    pub y_axis: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ChartFilters>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartDataPreparer;

impl ChartDataPreparer {
    pub fn new() -> Self {
        Self
    }

    pub fn prepare_request(&self, df: &DataFrame, request: &ChartRequest) -> ChartResult<Vec<Record>> {
        self.prepare(
            df,
            request.chart_type,
            &request.x_axis,
            &request.y_axis,
            request.filters.as_ref(),
        )
    }

    /// Applies `filters`, then shapes rows for `chart_type`. Fails when the
    /// x-axis column, or a y column the layout aggregates, is absent.
    pub fn prepare(
        &self,
        df: &DataFrame,
        chart_type: ChartType,
        x_axis: &str,
        y_axes: &[String],
        filters: Option<&ChartFilters>,
    ) -> ChartResult<Vec<Record>> {
        let filtered = match filters {
            Some(filters) if !filters.is_empty() => apply_filters(df, filters)?,
            _ => df.clone(),
        };
        require_column(&filtered, x_axis)?;
        debug!(
            "Preparing {chart_type} data from {} rows",
            filtered.row_count()
        );
        match chart_type {
            ChartType::Pie | ChartType::Donut => match y_axes.first() {
                Some(value_column) => aggregate_sum(&filtered, x_axis, value_column),
                None => project(&filtered, x_axis, y_axes),
            },
            ChartType::Line | ChartType::Area => {
                let is_temporal = filtered
                    .get_column(x_axis)
                    .is_some_and(|c| c.data_type().is_temporal());
                if is_temporal {
                    project(&filtered.sort_by(x_axis, true)?, x_axis, y_axes)
                } else {
                    project(&filtered, x_axis, y_axes)
                }
            }
            ChartType::Heatmap if y_axes.len() >= 2 => {
                pivot_mean(&filtered, x_axis, &y_axes[0], &y_axes[1])
            }
            ChartType::Box => quartile_summaries(&filtered, x_axis, y_axes),
            _ => project(&filtered, x_axis, y_axes),
        }
    }
}

fn require_column<'a>(df: &'a DataFrame, name: &str) -> ChartResult<&'a Column> {
    df.get_column(name).ok_or_else(|| ChartError::MissingColumn {
        column: name.to_string(),
    })
}

fn require_numeric<'a>(df: &'a DataFrame, name: &str) -> ChartResult<&'a Column> {
    let column = require_column(df, name)?;
    if column.data_type().is_numeric() {
        Ok(column)
    } else {
        Err(ChartError::InvalidRequest(format!(
            "column '{name}' must be numeric"
        )))
    }
}

/// Filter keys that are not columns are ignored.
fn apply_filters(df: &DataFrame, filters: &ChartFilters) -> ChartResult<DataFrame> {
    let mut current = df.clone();
    for (name, wanted) in filters {
        let Some(column) = current.get_column(name) else {
            continue;
        };
        let next = current.filter(|i| {
            let cell = column.get_scalar(i);
            match wanted {
                Value::Array(options) => options.iter().any(|option| cell.matches_json(option)),
                single => cell.matches_json(single),
            }
        })?;
        current = next;
    }
    Ok(current)
}

/// Row indices per distinct non-null key, keys in ascending order.
fn group_rows(column: &Column) -> Vec<(Scalar, Vec<usize>)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Scalar, Vec<usize>)> = Vec::new();
    for (row, key) in column.scalars().enumerate() {
        let Some(rendered) = key.render() else {
            continue;
        };
        match positions.get(&rendered) {
            Some(&slot) => groups[slot].1.push(row),
            None => {
                positions.insert(rendered, groups.len());
                groups.push((key, vec![row]));
            }
        }
    }
    groups.sort_by(|a, b| a.0.total_cmp(&b.0));
    groups
}

fn project(df: &DataFrame, x_axis: &str, y_axes: &[String]) -> ChartResult<Vec<Record>> {
    let names: Vec<&str> = std::iter::once(x_axis)
        .chain(y_axes.iter().map(String::as_str))
        .filter(|name| df.has_column(name))
        .collect();
    let columns: Vec<(&str, &Column)> = names
        .iter()
        .filter_map(|name| df.get_column(name).map(|c| (*name, c)))
        .collect();
    Ok((0..df.row_count())
        .map(|i| {
            columns
                .iter()
                .map(|(name, column)| (name.to_string(), column.get_scalar(i).to_json()))
                .collect()
        })
        .collect())
}

fn aggregate_sum(df: &DataFrame, x_axis: &str, value_name: &str) -> ChartResult<Vec<Record>> {
    let keys = require_column(df, x_axis)?;
    let values = require_numeric(df, value_name)?;
    let integral = values.data_type() == DataType::Int64;
    Ok(group_rows(keys)
        .into_iter()
        .map(|(key, rows)| {
            let integral_total = if integral {
                rows.iter()
                    .filter_map(|&row| match values.get_scalar(row) {
                        Scalar::Int(v) => Some(v),
                        _ => None,
                    })
                    .try_fold(0i64, i64::checked_add)
            } else {
                None
            };
            // Integer totals that overflow are reported as floats.
            let total = match integral_total {
                Some(total) => json!(total),
                None => {
                    Scalar::Float(rows.iter().filter_map(|&row| values.to_f64(row)).sum()).to_json()
                }
            };
            let mut record = Map::new();
            record.insert(x_axis.to_string(), key.to_json());
            record.insert(value_name.to_string(), total);
            record
        })
        .collect())
}

/// Mean of `value_name` per (`index_name`, `x_axis`) cell. Rows and columns
/// with no values at all are dropped; the index value is keyed by `x_axis`.
fn pivot_mean(
    df: &DataFrame,
    x_axis: &str,
    index_name: &str,
    value_name: &str,
) -> ChartResult<Vec<Record>> {
    let columns = require_column(df, x_axis)?;
    let index = require_column(df, index_name)?;
    let values = require_numeric(df, value_name)?;

    let column_groups = group_rows(columns);
    let column_of_row: HashMap<usize, usize> = column_groups
        .iter()
        .enumerate()
        .flat_map(|(slot, (_, rows))| rows.iter().map(move |&row| (row, slot)))
        .collect();

    let mut cells: Vec<(Scalar, Vec<Option<f64>>)> = Vec::new();
    for (key, rows) in group_rows(index) {
        let mut sums = vec![(0.0, 0usize); column_groups.len()];
        for row in rows {
            if let (Some(&slot), Some(v)) = (column_of_row.get(&row), values.to_f64(row)) {
                sums[slot].0 += v;
                sums[slot].1 += 1;
            }
        }
        let means: Vec<Option<f64>> = sums
            .into_iter()
            .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
            .collect();
        if means.iter().any(Option::is_some) {
            cells.push((key, means));
        }
    }

    let kept_columns: Vec<usize> = (0..column_groups.len())
        .filter(|&slot| cells.iter().any(|(_, means)| means[slot].is_some()))
        .collect();
    Ok(cells
        .into_iter()
        .map(|(key, means)| {
            let mut record = Map::new();
            record.insert(x_axis.to_string(), key.to_json());
            for &slot in &kept_columns {
                let name = column_groups[slot].0.render().unwrap_or_default();
                let cell = means[slot].map_or(Value::Null, |m| Scalar::Float(m).to_json());
                record.insert(name, cell);
            }
            record
        })
        .collect())
}

/// One record per (category, y column). Groups whose values are all null
/// report zeroed statistics.
fn quartile_summaries(df: &DataFrame, x_axis: &str, y_axes: &[String]) -> ChartResult<Vec<Record>> {
    let categories = group_rows(require_column(df, x_axis)?);
    let mut records = Vec::new();
    for y_name in y_axes.iter().filter(|name| df.has_column(name)) {
        let column = require_numeric(df, y_name)?;
        for (category, rows) in &categories {
            let cells: Vec<Scalar> = rows
                .iter()
                .map(|&row| column.get_scalar(row))
                .filter(|v| !v.is_null())
                .collect();
            let numbers: Vec<f64> = cells.iter().filter_map(Scalar::as_f64).collect();
            let summary = Quartiles::of(&numbers);
            let mut record = Map::new();
            record.insert("category".into(), category.to_json());
            record.insert("variable".into(), Value::String(y_name.clone()));
            record.insert(
                "values".into(),
                Value::Array(cells.iter().map(Scalar::to_json).collect()),
            );
            record.insert("q1".into(), json!(summary.q1));
            record.insert("median".into(), json!(summary.median));
            record.insert("q3".into(), json!(summary.q3));
            record.insert("min".into(), json!(summary.min));
            record.insert("max".into(), json!(summary.max));
            records.push(record);
        }
    }
    debug!("Built {} box summaries", records.len());
    Ok(records)
}
