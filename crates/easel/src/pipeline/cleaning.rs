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
use crate::frame::{Column, ColumnData, DataFrame, Scalar};
use crate::pipeline::{PipelineSettings, StepOutcome};
use crate::recommendation::{CleaningAction, CleaningStep, FillMethod, OutlierMethod, TargetType};
use crate::stats;
use serde_json::Value;
use tracing::debug;

const IQR_FENCE: f64 = 1.5;

pub fn apply_step(
    df: &DataFrame,
    step: &CleaningStep,
    settings: &PipelineSettings,
) -> PipelineResult<StepOutcome> {
    let name = step.column_name.as_str();
    match &step.action {
        CleaningAction::DropColumn => {
            let mut next = df.clone();
            if next.drop_column(name) {
                Ok(StepOutcome::Applied(next, format!("Dropped column '{name}'")))
            } else {
                Ok(StepOutcome::Skipped(format!(
                    "Skipped drop_column: '{name}' is not in the dataset"
                )))
            }
        }
        CleaningAction::FillNulls { method, value } => {
            fill_nulls(df, name, *method, value.as_ref(), settings)
        }
        CleaningAction::RemoveOutliers { method, threshold } => {
            remove_outliers(df, name, *method, threshold.unwrap_or(settings.zscore_threshold))
        }
        CleaningAction::ConvertType { target_type } => {
            let target = target_type.ok_or_else(|| {
                PipelineError::InvalidParameters("convert_type requires a target_type".into())
            })?;
            convert_type(df, name, target, settings)
        }
        CleaningAction::DropNulls => {
            let column = require(df, name)?;
            let next = df.filter(|i| !column.is_null(i))?;
            debug!("drop_nulls removed {} rows", df.row_count() - next.row_count());
            Ok(StepOutcome::Applied(
                next,
                format!("Dropped rows with nulls in '{name}'"),
            ))
        }
    }
}

fn require<'a>(df: &'a DataFrame, name: &str) -> PipelineResult<&'a Column> {
    df.get_column(name)
        .ok_or_else(|| PipelineError::ColumnNotFound(name.to_string()))
}

fn replace(df: &DataFrame, name: &str, column: Column) -> PipelineResult<DataFrame> {
    let mut next = df.clone();
    next.add_column(name.to_string(), column)?;
    Ok(next)
}

fn no_values(name: &str) -> PipelineError {
    PipelineError::InvalidParameters(format!("column '{name}' has no non-null values"))
}

fn fill_nulls(
    df: &DataFrame,
    name: &str,
    method: FillMethod,
    value: Option<&Value>,
    settings: &PipelineSettings,
) -> PipelineResult<StepOutcome> {
    let column = require(df, name)?;
    let filled = match method {
        FillMethod::Mean | FillMethod::Median => {
            if !column.data_type().is_numeric() {
                return Ok(StepOutcome::Skipped(format!(
                    "Skipped filling nulls in '{name}': {} needs a numeric column",
                    method.as_str()
                )));
            }
            let values = column.numeric_values();
            let fill = if method == FillMethod::Mean {
                stats::mean(&values)
            } else {
                stats::median(&values)
            };
            column.fill_nulls(&Scalar::Float(fill.ok_or_else(|| no_values(name))?))?
        }
        FillMethod::Mode => {
            let mode = column.mode().ok_or_else(|| no_values(name))?;
            column.fill_nulls(&mode)?
        }
        FillMethod::ForwardFill => column.forward_fill(),
        FillMethod::Literal => {
            let fill = value
                .map(Scalar::from_json)
                .unwrap_or_else(|| Scalar::Text(settings.default_fill_value.clone()));
            column.fill_nulls(&fill)?
        }
    };
    Ok(StepOutcome::Applied(
        replace(df, name, filled)?,
        format!("Filled nulls in '{name}' using {}", method.as_str()),
    ))
}

/// Rows whose value lies outside the fences are removed, as are rows where
/// the column is null.
fn remove_outliers(
    df: &DataFrame,
    name: &str,
    method: OutlierMethod,
    zscore_threshold: f64,
) -> PipelineResult<StepOutcome> {
    let column = require(df, name)?;
    if !column.data_type().is_numeric() {
        return Ok(StepOutcome::Skipped(format!(
            "Skipped outlier removal on '{name}': column is not numeric"
        )));
    }
    let values = column.numeric_values();
    let (next, label) = match method {
        OutlierMethod::Iqr => {
            let quartiles = stats::Quartiles::of(&values);
            let spread = quartiles.q3 - quartiles.q1;
            let lower = quartiles.q1 - IQR_FENCE * spread;
            let upper = quartiles.q3 + IQR_FENCE * spread;
            let next = df.filter(|i| column.to_f64(i).is_some_and(|v| v >= lower && v <= upper))?;
            (next, "IQR")
        }
        OutlierMethod::Zscore => {
            let mean = stats::mean(&values).unwrap_or(0.0);
            let std = stats::sample_std(&values).filter(|s| *s > 0.0);
            let next = df.filter(|i| {
                column.to_f64(i).is_some_and(|v| match std {
                    Some(std) => ((v - mean) / std).abs() < zscore_threshold,
                    None => true,
                })
            })?;
            (next, "Z-score")
        }
    };
    debug!(
        "Outlier removal on '{name}' dropped {} rows",
        df.row_count() - next.row_count()
    );
    Ok(StepOutcome::Applied(
        next,
        format!("Removed outliers from '{name}' using {label} method"),
    ))
}

fn convert_type(
    df: &DataFrame,
    name: &str,
    target: TargetType,
    settings: &PipelineSettings,
) -> PipelineResult<StepOutcome> {
    let column = require(df, name)?;
    let converted = match target {
        TargetType::Datetime => column.to_datetime(&settings.temporal_formats),
        TargetType::Numeric => column.to_numeric(),
        TargetType::String => column.to_text(),
    };
    let lost = converted.null_count().saturating_sub(column.null_count());
    if lost > 0 {
        debug!("{lost} values in '{name}' could not be converted to {}", target.as_str());
    }
    Ok(StepOutcome::Applied(
        replace(df, name, converted)?,
        format!("Converted '{name}' to {}", target.as_str()),
    ))
}
