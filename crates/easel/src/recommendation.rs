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

//! Recommendation documents consumed by the transformation pipeline.
//!
//! Action and operation tags are closed enums; a document naming an unknown
//! tag or an unknown method fails to parse instead of being skipped.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRecommendation {
    #[serde(default)]
    pub columns_to_drop: Vec<String>,
    /// Advisory only; the pipeline does not enforce it.
    #[serde(default)]
    pub columns_to_keep: Vec<String>,
    #[serde(default)]
    pub cleaning_steps: Vec<CleaningStep>,
    #[serde(default)]
    pub feature_engineering: Vec<FeatureSpec>,
    #[serde(default)]
    pub filtering_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl ProcessingRecommendation {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn is_empty(&self) -> bool {
        self.columns_to_drop.is_empty()
            && self.cleaning_steps.is_empty()
            && self.feature_engineering.is_empty()
            && self.filtering_criteria.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    #[default]
    Mean,
    Median,
    Mode,
    #[serde(alias = "ffill")]
    ForwardFill,
    #[serde(alias = "value", alias = "constant")]
    Literal,
}

impl FillMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::Mean => "mean",
            FillMethod::Median => "median",
            FillMethod::Mode => "mode",
            FillMethod::ForwardFill => "forward_fill",
            FillMethod::Literal => "literal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    #[default]
    Iqr,
    #[serde(alias = "z_score")]
    Zscore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Datetime,
    Numeric,
    String,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Datetime => "datetime",
            TargetType::Numeric => "numeric",
            TargetType::String => "string",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CleaningAction {
    FillNulls {
        method: FillMethod,
        value: Option<Value>,
    },
    RemoveOutliers {
        method: OutlierMethod,
        threshold: Option<f64>,
    },
    ConvertType {
        target_type: Option<TargetType>,
    },
    DropColumn,
    DropNulls,
}

impl CleaningAction {
    pub fn name(&self) -> &'static str {
        match self {
            CleaningAction::FillNulls { .. } => "fill_nulls",
            CleaningAction::RemoveOutliers { .. } => "remove_outliers",
            CleaningAction::ConvertType { .. } => "convert_type",
            CleaningAction::DropColumn => "drop_column",
            CleaningAction::DropNulls => "drop_nulls",
        }
    }
}

impl fmt::Display for CleaningAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCleaningStep", into = "RawCleaningStep")]
pub struct CleaningStep {
    pub column_name: String,
    pub action: CleaningAction,
    pub reason: Option<String>,
}

impl CleaningStep {
    pub fn new(column_name: impl Into<String>, action: CleaningAction) -> Self {
        Self {
            column_name: column_name.into(),
            action,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CleaningActionTag {
    FillNulls,
    RemoveOutliers,
    ConvertType,
    DropColumn,
    DropNulls,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCleaningStep {
    column_name: String,
    action: CleaningActionTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FillNullsParameters {
    method: FillMethod,
    value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OutlierParameters {
    method: OutlierMethod,
    threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConvertTypeParameters {
    #[serde(alias = "target")]
    target_type: Option<TargetType>,
}

fn parameters_of<T>(parameters: Option<Value>) -> Result<T, String>
where
    T: Default + serde::de::DeserializeOwned,
{
    match parameters {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| e.to_string()),
    }
}

impl TryFrom<RawCleaningStep> for CleaningStep {
    type Error = String;

    fn try_from(raw: RawCleaningStep) -> Result<Self, Self::Error> {
        let action = match raw.action {
            CleaningActionTag::FillNulls => {
                let p: FillNullsParameters = parameters_of(raw.parameters)?;
                CleaningAction::FillNulls {
                    method: p.method,
                    value: p.value,
                }
            }
            CleaningActionTag::RemoveOutliers => {
                let p: OutlierParameters = parameters_of(raw.parameters)?;
                CleaningAction::RemoveOutliers {
                    method: p.method,
                    threshold: p.threshold,
                }
            }
            CleaningActionTag::ConvertType => {
                let p: ConvertTypeParameters = parameters_of(raw.parameters)?;
                CleaningAction::ConvertType {
                    target_type: p.target_type,
                }
            }
            CleaningActionTag::DropColumn => CleaningAction::DropColumn,
            CleaningActionTag::DropNulls => CleaningAction::DropNulls,
        };
        Ok(CleaningStep {
            column_name: raw.column_name,
            action,
            reason: raw.reason,
        })
    }
}

impl From<CleaningStep> for RawCleaningStep {
    fn from(step: CleaningStep) -> Self {
        let (action, parameters) = match step.action {
            CleaningAction::FillNulls { method, value } => {
                let mut params = json!({ "method": method });
                if let Some(value) = value {
                    params["value"] = value;
                }
                (CleaningActionTag::FillNulls, Some(params))
            }
            CleaningAction::RemoveOutliers { method, threshold } => {
                let mut params = json!({ "method": method });
                if let Some(threshold) = threshold {
                    params["threshold"] = json!(threshold);
                }
                (CleaningActionTag::RemoveOutliers, Some(params))
            }
            CleaningAction::ConvertType { target_type } => (
                CleaningActionTag::ConvertType,
                Some(json!({ "target_type": target_type })),
            ),
            CleaningAction::DropColumn => (CleaningActionTag::DropColumn, None),
            CleaningAction::DropNulls => (CleaningActionTag::DropNulls, None),
        };
        RawCleaningStep {
            column_name: step.column_name,
            action,
            parameters,
            reason: step.reason,
        }
    }
}

/// Bin specification for `bin_numeric`: a bucket count or explicit edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinSpec {
    Count(usize),
    Edges(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOperation {
    ExtractYear,
    ExtractMonth,
    ExtractDay,
    Concatenate,
    Sum,
    Average,
    BinNumeric {
        bins: Option<BinSpec>,
        labels: Option<Vec<String>>,
    },
    Categorize {
        bins: Vec<f64>,
        labels: Vec<String>,
    },
}

impl FeatureOperation {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureOperation::ExtractYear => "extract_year",
            FeatureOperation::ExtractMonth => "extract_month",
            FeatureOperation::ExtractDay => "extract_day",
            FeatureOperation::Concatenate => "concatenate",
            FeatureOperation::Sum => "sum",
            FeatureOperation::Average => "average",
            FeatureOperation::BinNumeric { .. } => "bin_numeric",
            FeatureOperation::Categorize { .. } => "categorize",
        }
    }
}

impl fmt::Display for FeatureOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureSpec", into = "RawFeatureSpec")]
pub struct FeatureSpec {
    pub new_column_name: String,
    pub operation: FeatureOperation,
    pub source_columns: Vec<String>,
    pub description: Option<String>,
}

impl FeatureSpec {
    pub fn new<S: Into<String>>(
        new_column_name: impl Into<String>,
        operation: FeatureOperation,
        source_columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            new_column_name: new_column_name.into(),
            operation,
            source_columns: source_columns.into_iter().map(Into::into).collect(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FeatureOperationTag {
    ExtractYear,
    ExtractMonth,
    ExtractDay,
    Concatenate,
    Sum,
    Average,
    BinNumeric,
    Categorize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawFeatureSpec {
    new_column_name: String,
    operation: FeatureOperationTag,
    #[serde(default)]
    source_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BinParameters {
    bins: Option<BinSpec>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategorizeParameters {
    bins: Vec<f64>,
    labels: Vec<String>,
}

impl TryFrom<RawFeatureSpec> for FeatureSpec {
    type Error = String;

    fn try_from(raw: RawFeatureSpec) -> Result<Self, Self::Error> {
        let operation = match raw.operation {
            FeatureOperationTag::ExtractYear => FeatureOperation::ExtractYear,
            FeatureOperationTag::ExtractMonth => FeatureOperation::ExtractMonth,
            FeatureOperationTag::ExtractDay => FeatureOperation::ExtractDay,
            FeatureOperationTag::Concatenate => FeatureOperation::Concatenate,
            FeatureOperationTag::Sum => FeatureOperation::Sum,
            FeatureOperationTag::Average => FeatureOperation::Average,
            FeatureOperationTag::BinNumeric => {
                let p: BinParameters = parameters_of(raw.parameters)?;
                FeatureOperation::BinNumeric {
                    bins: p.bins,
                    labels: p.labels,
                }
            }
            FeatureOperationTag::Categorize => {
                let p: CategorizeParameters = parameters_of(raw.parameters)?;
                FeatureOperation::Categorize {
                    bins: p.bins,
                    labels: p.labels,
                }
            }
        };
        Ok(FeatureSpec {
            new_column_name: raw.new_column_name,
            operation,
            source_columns: raw.source_columns,
            description: raw.description,
        })
    }
}

impl From<FeatureSpec> for RawFeatureSpec {
    fn from(spec: FeatureSpec) -> Self {
        let (operation, parameters) = match spec.operation {
            FeatureOperation::ExtractYear => (FeatureOperationTag::ExtractYear, None),
            FeatureOperation::ExtractMonth => (FeatureOperationTag::ExtractMonth, None),
            FeatureOperation::ExtractDay => (FeatureOperationTag::ExtractDay, None),
            FeatureOperation::Concatenate => (FeatureOperationTag::Concatenate, None),
            FeatureOperation::Sum => (FeatureOperationTag::Sum, None),
            FeatureOperation::Average => (FeatureOperationTag::Average, None),
            FeatureOperation::BinNumeric { bins, labels } => (
                FeatureOperationTag::BinNumeric,
                Some(json!({ "bins": bins, "labels": labels })),
            ),
            FeatureOperation::Categorize { bins, labels } => (
                FeatureOperationTag::Categorize,
                Some(json!({ "bins": bins, "labels": labels })),
            ),
        };
        RawFeatureSpec {
            new_column_name: spec.new_column_name,
            operation,
            source_columns: spec.source_columns,
            parameters,
            description: spec.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let doc = ProcessingRecommendation::from_json(
            r#"{
                "columns_to_drop": ["id"],
                "columns_to_keep": ["price"],
                "cleaning_steps": [
                    {"column_name": "price", "action": "fill_nulls", "parameters": {"method": "median"}, "reason": "gaps"},
                    {"column_name": "price", "action": "remove_outliers", "parameters": {"method": "zscore", "threshold": 2.5}},
                    {"column_name": "date", "action": "convert_type", "parameters": {"target": "datetime"}},
                    {"column_name": "notes", "action": "drop_column"}
                ],
                "feature_engineering": [
                    {"new_column_name": "band", "operation": "bin_numeric", "source_columns": ["price"], "parameters": {"bins": 3}}
                ],
                "filtering_criteria": ["price > 10"],
                "explanation": "tidy"
            }"#,
        )
        .unwrap();
        assert_eq!(doc.cleaning_steps.len(), 4);
        assert_eq!(
            doc.cleaning_steps[1].action,
            CleaningAction::RemoveOutliers {
                method: OutlierMethod::Zscore,
                threshold: Some(2.5)
            }
        );
        assert_eq!(
            doc.cleaning_steps[2].action,
            CleaningAction::ConvertType {
                target_type: Some(TargetType::Datetime)
            }
        );
        assert_eq!(
            doc.feature_engineering[0].operation,
            FeatureOperation::BinNumeric {
                bins: Some(BinSpec::Count(3)),
                labels: None
            }
        );
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let unknown_action =
            r#"{"cleaning_steps": [{"column_name": "a", "action": "shuffle"}]}"#;
        assert!(ProcessingRecommendation::from_json(unknown_action).is_err());

        let unknown_method = r#"{"cleaning_steps": [{"column_name": "a", "action": "fill_nulls", "parameters": {"method": "guess"}}]}"#;
        assert!(ProcessingRecommendation::from_json(unknown_method).is_err());

        let unknown_operation = r#"{"feature_engineering": [{"new_column_name": "b", "operation": "explode", "source_columns": ["a"]}]}"#;
        assert!(ProcessingRecommendation::from_json(unknown_operation).is_err());
    }

    #[test]
    fn missing_parameters_use_defaults() {
        let doc = ProcessingRecommendation::from_json(
            r#"{"cleaning_steps": [{"column_name": "a", "action": "fill_nulls", "parameters": null}]}"#,
        )
        .unwrap();
        assert_eq!(
            doc.cleaning_steps[0].action,
            CleaningAction::FillNulls {
                method: FillMethod::Mean,
                value: None
            }
        );
        assert!(ProcessingRecommendation::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn serialises_back_to_document_shape() {
        let step = CleaningStep::new(
            "a",
            CleaningAction::FillNulls {
                method: FillMethod::Literal,
                value: Some(json!("n/a")),
            },
        );
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(
            value,
            json!({"column_name": "a", "action": "fill_nulls", "parameters": {"method": "literal", "value": "n/a"}})
        );
        let back: CleaningStep = serde_json::from_value(value).unwrap();
        assert_eq!(back, step);
    }
}
