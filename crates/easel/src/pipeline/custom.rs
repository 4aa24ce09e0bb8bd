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

//! Ad-hoc operations sent one by one, outside a recommendation document.
//! Each operation names a single column; operations on columns the dataset
//! lacks are skipped.

use crate::error::{PipelineError, PipelineResult};
use crate::frame::{ColumnData, DataFrame, Scalar};
use crate::pipeline::{cleaning, PipelineSettings, StepOutcome};
use crate::recommendation::{CleaningAction, CleaningStep, FillMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CustomOperation {
    DropColumn {
        column: String,
    },
    FillNulls {
        column: String,
        #[serde(default)]
        method: FillMethod,
        #[serde(default)]
        value: Option<Value>,
    },
    Filter {
        column: String,
        condition: FilterCondition,
        value: Value,
    },
    Sort {
        column: String,
        #[serde(default = "ascending_by_default")]
        ascending: bool,
    },
}

fn ascending_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Gt,
    Lt,
    Eq,
    Ne,
    In,
}

impl FilterCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCondition::Gt => "gt",
            FilterCondition::Lt => "lt",
            FilterCondition::Eq => "eq",
            FilterCondition::Ne => "ne",
            FilterCondition::In => "in",
        }
    }
}

impl CustomOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            CustomOperation::DropColumn { .. } => "drop_column",
            CustomOperation::FillNulls { .. } => "fill_nulls",
            CustomOperation::Filter { .. } => "filter",
            CustomOperation::Sort { .. } => "sort",
        }
    }

    pub fn column(&self) -> &str {
        match self {
            CustomOperation::DropColumn { column }
            | CustomOperation::FillNulls { column, .. }
            | CustomOperation::Filter { column, .. }
            | CustomOperation::Sort { column, .. } => column,
        }
    }
}

impl fmt::Display for CustomOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on '{}'", self.kind(), self.column())
    }
}

pub fn apply_operation(
    df: &DataFrame,
    operation: &CustomOperation,
    settings: &PipelineSettings,
) -> PipelineResult<StepOutcome> {
    if !df.has_column(operation.column()) {
        return Ok(StepOutcome::Skipped(format!(
            "Skipped {}: '{}' is not in the dataset",
            operation.kind(),
            operation.column()
        )));
    }
    match operation {
        CustomOperation::DropColumn { column } => {
            cleaning::apply_step(df, &CleaningStep::new(column.as_str(), CleaningAction::DropColumn), settings)
        }
        CustomOperation::FillNulls { column, method, value } => {
            let action = CleaningAction::FillNulls {
                method: *method,
                value: value.clone(),
            };
            cleaning::apply_step(df, &CleaningStep::new(column.as_str(), action), settings)
        }
        CustomOperation::Filter { column, condition, value } => filter_rows(df, column, *condition, value),
        CustomOperation::Sort { column, ascending } => {
            let sorted = df.sort_by(column, *ascending)?;
            let direction = if *ascending { "ascending" } else { "descending" };
            Ok(StepOutcome::Applied(sorted, format!("Sorted by '{column}' {direction}")))
        }
    }
}

/// Nulls never satisfy `gt`, `lt`, `eq` or `in`; they always satisfy `ne`.
fn filter_rows(
    df: &DataFrame,
    column_name: &str,
    condition: FilterCondition,
    value: &Value,
) -> PipelineResult<StepOutcome> {
    let column = df.column(column_name)?;
    let before = df.row_count();
    let filtered = match condition {
        FilterCondition::Gt | FilterCondition::Lt => {
            let wanted = if condition == FilterCondition::Gt {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let bound = Scalar::from_json(value);
            if bound.is_null() {
                return Err(PipelineError::InvalidParameters(format!(
                    "'{}' filter needs a value",
                    condition.as_str()
                )));
            }
            df.filter(|i| {
                let cell = column.get_scalar(i);
                !cell.is_null() && cell.total_cmp(&bound) == wanted
            })?
        }
        FilterCondition::Eq => df.filter(|i| column.get_scalar(i).matches_json(value))?,
        FilterCondition::Ne => df.filter(|i| {
            let cell = column.get_scalar(i);
            cell.is_null() || !cell.matches_json(value)
        })?,
        FilterCondition::In => {
            let Value::Array(options) = value else {
                return Err(PipelineError::InvalidParameters(
                    "'in' filter needs a list of values".to_string(),
                ));
            };
            df.filter(|i| {
                let cell = column.get_scalar(i);
                !cell.is_null() && options.iter().any(|option| cell.matches_json(option))
            })?
        }
    };
    let entry = format!(
        "Filtered '{column_name}' {} {value}: {before} -> {} rows",
        condition.as_str(),
        filtered.row_count()
    );
    Ok(StepOutcome::Applied(filtered, entry))
}
