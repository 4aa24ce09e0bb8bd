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

use easel::frame::{Column, ColumnData, DataFrame, DataType, Scalar};
use easel::pipeline::{FilterCriterion, TransformationPipeline};
use easel::recommendation::{
    CleaningAction, CleaningStep, FeatureOperation, FeatureSpec, FillMethod, OutlierMethod,
    ProcessingRecommendation,
};
use serde_json::json;

fn people() -> DataFrame {
    DataFrame::from_columns(
        "people",
        vec![
            ("name", Column::from(vec![Some("ann"), Some("bob"), Some("cy"), Some("dee")])),
            ("age", Column::from(vec![Some(25i64), Some(40), Some(31), None])),
            (
                "status",
                Column::from(vec![Some("active"), Some("inactive"), Some("active"), None]),
            ),
            ("score", Column::from(vec![Some(2.0), None, Some(6.0), Some(4.0)])),
        ],
    )
    .unwrap()
}

fn with_steps(steps: Vec<CleaningStep>) -> ProcessingRecommendation {
    ProcessingRecommendation {
        cleaning_steps: steps,
        ..ProcessingRecommendation::default()
    }
}

fn values(df: &DataFrame, column: &str) -> Vec<Scalar> {
    df.column(column).unwrap().scalars().collect()
}

#[test]
fn empty_recommendation_only_logs_final_shape() {
    let df = people();
    let (out, log) = TransformationPipeline::new().run(&df, &ProcessingRecommendation::default());
    assert_eq!(out.row_count(), 4);
    assert_eq!(out.column_count(), 4);
    assert_eq!(log.entries(), &["Final dataset: 4 rows, 4 columns".to_string()]);
}

#[test]
fn iqr_removes_extreme_value() {
    let df = DataFrame::from_columns(
        "v",
        vec![("v", Column::from(vec![Some(1i64), Some(2), Some(3), Some(4), Some(5), Some(1000)]))],
    )
    .unwrap();
    let rec = with_steps(vec![CleaningStep::new(
        "v",
        CleaningAction::RemoveOutliers {
            method: OutlierMethod::Iqr,
            threshold: None,
        },
    )]);
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    let kept: Vec<f64> = out.column("v").unwrap().numeric_values();
    assert_eq!(kept, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(log.len(), 2);
}

#[test]
fn zscore_with_constant_column_keeps_every_row() {
    let df = DataFrame::from_columns("v", vec![("v", Column::from(vec![Some(7.0); 5]))]).unwrap();
    let rec = with_steps(vec![CleaningStep::new(
        "v",
        CleaningAction::RemoveOutliers {
            method: OutlierMethod::Zscore,
            threshold: Some(1.0),
        },
    )]);
    let (out, _) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(out.row_count(), 5);
}

#[test]
fn mean_fill_replaces_nulls() {
    let df = DataFrame::from_columns("v", vec![("v", Column::from(vec![Some(2i64), None, Some(6)]))])
        .unwrap();
    let rec = with_steps(vec![CleaningStep::new(
        "v",
        CleaningAction::FillNulls {
            method: FillMethod::Mean,
            value: None,
        },
    )]);
    let (out, _) = TransformationPipeline::new().run(&df, &rec);
    let filled = out.column("v").unwrap().numeric_values();
    assert_eq!(filled, vec![2.0, 4.0, 6.0]);
    assert_eq!(out.column("v").unwrap().null_count(), 0);
}

#[test]
fn mean_fill_on_text_is_skipped() {
    let rec = with_steps(vec![CleaningStep::new(
        "status",
        CleaningAction::FillNulls {
            method: FillMethod::Mean,
            value: None,
        },
    )]);
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(out.column("status").unwrap().null_count(), 1);
    assert!(log.entries()[0].starts_with("Skipped"));
}

#[test]
fn literal_fill_uses_default_value() {
    let rec = with_steps(vec![CleaningStep::new(
        "status",
        CleaningAction::FillNulls {
            method: FillMethod::Literal,
            value: None,
        },
    )]);
    let (out, _) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(values(&out, "status")[3], Scalar::Text("Unknown".into()));
}

#[test]
fn numeric_filter_keeps_matching_rows() {
    let rec = ProcessingRecommendation {
        filtering_criteria: vec!["age > 30".into()],
        ..ProcessingRecommendation::default()
    };
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(values(&out, "age"), vec![Scalar::Int(40), Scalar::Int(31)]);
    assert_eq!(log.entries()[0], "Applied filter: age > 30");
}

#[test]
fn equality_filter_on_text() {
    let rec = ProcessingRecommendation {
        filtering_criteria: vec!["status == active".into()],
        ..ProcessingRecommendation::default()
    };
    let (out, _) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(
        values(&out, "name"),
        vec![Scalar::Text("ann".into()), Scalar::Text("cy".into())]
    );
}

#[test]
fn not_equal_keeps_nulls() {
    let criterion: FilterCriterion = "status != active".parse().unwrap();
    let out = criterion.apply(&people()).unwrap();
    assert_eq!(out.row_count(), 2);
}

#[test]
fn bad_filter_is_logged_and_ignored() {
    let rec = ProcessingRecommendation {
        filtering_criteria: vec!["age >= 30".into(), "missing > 1".into()],
        ..ProcessingRecommendation::default()
    };
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(out.row_count(), 4);
    assert!(log.entries()[0].starts_with("Error applying filter 'age >= 30'"));
    assert!(log.entries()[1].starts_with("Error applying filter 'missing > 1'"));
}

#[test]
fn dropping_missing_columns_is_logged() {
    let rec = ProcessingRecommendation {
        columns_to_drop: vec!["ghost".into(), "score".into()],
        cleaning_steps: vec![CleaningStep::new("ghost", CleaningAction::DropColumn)],
        ..ProcessingRecommendation::default()
    };
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert!(!out.has_column("score"));
    assert_eq!(out.column_count(), 3);
    assert_eq!(log.entries()[0], r#"Dropped columns: ["ghost", "score"]"#);
    assert!(log.entries()[1].contains("'ghost' is not in the dataset"));
}

#[test]
fn failing_step_leaves_dataset_untouched() {
    let df = DataFrame::from_columns(
        "v",
        vec![
            ("empty", Column::nulls(DataType::Float64, 3)),
            ("v", Column::from(vec![Some(1i64), Some(2), Some(3)])),
        ],
    )
    .unwrap();
    let rec = with_steps(vec![
        CleaningStep::new(
            "empty",
            CleaningAction::FillNulls {
                method: FillMethod::Median,
                value: None,
            },
        ),
        CleaningStep::new("v", CleaningAction::ConvertType { target_type: None }),
    ]);
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(out.column("empty").unwrap().null_count(), 3);
    assert!(log.entries()[0].starts_with("Error in fill_nulls on 'empty'"));
    assert!(log.entries()[1].starts_with("Error in convert_type on 'v'"));
    assert_eq!(log.last(), Some("Final dataset: 3 rows, 2 columns"));
}

#[test]
fn features_from_a_recommendation_document() {
    let df = DataFrame::from_columns(
        "orders",
        vec![
            ("placed", Column::from(vec![Some("2024-03-05"), Some("2023-12-31"), None])),
            ("qty", Column::from(vec![Some(1i64), Some(2), None])),
            ("extra", Column::from(vec![Some(10i64), None, None])),
            ("first", Column::from(vec![Some("a"), Some("b"), None])),
            ("last", Column::from(vec![Some("x"), None, Some("z")])),
        ],
    )
    .unwrap();
    let rec = ProcessingRecommendation::from_json(
        &json!({
            "cleaning_steps": [
                {"column_name": "placed", "action": "convert_type", "parameters": {"target_type": "datetime"}}
            ],
            "feature_engineering": [
                {"new_column_name": "year", "operation": "extract_year", "source_columns": ["placed"]},
                {"new_column_name": "total", "operation": "sum", "source_columns": ["qty", "extra"]},
                {"new_column_name": "full", "operation": "concatenate", "source_columns": ["first", "last"]},
                {"new_column_name": "broken", "operation": "average", "source_columns": ["nope"]}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(
        values(&out, "year"),
        vec![Scalar::Int(2024), Scalar::Int(2023), Scalar::Null]
    );
    assert_eq!(
        values(&out, "total"),
        vec![Scalar::Int(11), Scalar::Int(2), Scalar::Int(0)]
    );
    assert_eq!(values(&out, "full")[1], Scalar::Text("b ".into()));
    assert!(!out.has_column("broken"));
    assert!(log.entries().iter().any(|e| e.starts_with("Error creating 'broken'")));
}

#[test]
fn categorize_assigns_right_closed_buckets() {
    let df = DataFrame::from_columns(
        "v",
        vec![("age", Column::from(vec![Some(5i64), Some(18), Some(40), Some(90)]))],
    )
    .unwrap();
    let rec = ProcessingRecommendation {
        feature_engineering: vec![FeatureSpec::new(
            "band",
            FeatureOperation::Categorize {
                bins: vec![0.0, 18.0, 65.0],
                labels: vec!["minor".into(), "adult".into()],
            },
            ["age"],
        )],
        ..ProcessingRecommendation::default()
    };
    let (out, _) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(
        values(&out, "band"),
        vec![
            Scalar::Text("minor".into()),
            Scalar::Text("minor".into()),
            Scalar::Text("adult".into()),
            Scalar::Null
        ]
    );
}

#[test]
fn forward_fill_drop_nulls_and_binning_chain() {
    let rec = ProcessingRecommendation::from_json(
        &json!({
            "cleaning_steps": [
                {"column_name": "score", "action": "fill_nulls", "parameters": {"method": "forward_fill"}},
                {"column_name": "status", "action": "drop_nulls"}
            ],
            "feature_engineering": [
                {
                    "new_column_name": "age_band",
                    "operation": "bin_numeric",
                    "source_columns": ["age"],
                    "parameters": {"bins": 2, "labels": ["young", "old"]}
                }
            ]
        })
        .to_string(),
    )
    .unwrap();
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert_eq!(out.row_count(), 3);
    assert_eq!(
        values(&out, "score"),
        vec![Scalar::Float(2.0), Scalar::Float(2.0), Scalar::Float(6.0)]
    );
    assert_eq!(
        values(&out, "age_band"),
        vec![
            Scalar::Text("young".into()),
            Scalar::Text("old".into()),
            Scalar::Text("young".into())
        ]
    );
    assert_eq!(log.entries().len(), 4);
    assert_eq!(log.entries()[3], "Final dataset: 3 rows, 5 columns");
}

#[test]
fn unknown_action_fails_to_parse() {
    let err = ProcessingRecommendation::from_json(
        r#"{"cleaning_steps": [{"column_name": "a", "action": "teleport"}]}"#,
    );
    assert!(err.is_err());
}

#[test]
fn zscore_drops_values_beyond_threshold() {
    let mut raw = vec![Some(1i64); 9];
    raw.push(Some(100));
    let df = DataFrame::from_columns("v", vec![("v", Column::from(raw))]).unwrap();
    let rec = with_steps(vec![CleaningStep::new(
        "v",
        CleaningAction::RemoveOutliers {
            method: OutlierMethod::Zscore,
            threshold: Some(2.0),
        },
    )]);
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(out.row_count(), 9);
    assert!(out.column("v").unwrap().numeric_values().iter().all(|v| *v == 1.0));
    assert_eq!(log.entries()[0], "Removed outliers from 'v' using Z-score method");
}

#[test]
fn mode_fill_prefers_smallest_of_tied_values() {
    let df = DataFrame::from_columns(
        "m",
        vec![
            ("code", Column::from(vec![Some(3i64), Some(1), Some(3), Some(1), None])),
            ("tag", Column::from(vec![Some("a"), Some("b"), Some("b"), None, None])),
        ],
    )
    .unwrap();
    let fill_mode = |column: &str| {
        CleaningStep::new(
            column,
            CleaningAction::FillNulls {
                method: FillMethod::Mode,
                value: None,
            },
        )
    };
    let rec = with_steps(vec![fill_mode("code"), fill_mode("tag")]);
    let (out, _) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(values(&out, "code")[4], Scalar::Int(1));
    assert_eq!(
        &values(&out, "tag")[3..],
        &[Scalar::Text("b".into()), Scalar::Text("b".into())]
    );
}

#[test]
fn drop_column_step_removes_the_column() {
    let rec = with_steps(vec![CleaningStep::new("score", CleaningAction::DropColumn)]);
    let (out, log) = TransformationPipeline::new().run(&people(), &rec);
    assert!(!out.has_column("score"));
    assert_eq!(out.column_count(), 3);
    assert_eq!(log.entries()[0], "Dropped column 'score'");
}

#[test]
fn convert_type_to_numeric_and_string() {
    let df = DataFrame::from_columns(
        "c",
        vec![
            ("raw", Column::from(vec![Some("1"), Some("x"), Some(" 3 ")])),
            ("n", Column::from(vec![Some(7i64), None, Some(9)])),
        ],
    )
    .unwrap();
    let rec = ProcessingRecommendation::from_json(
        &json!({
            "cleaning_steps": [
                {"column_name": "raw", "action": "convert_type", "parameters": {"target_type": "numeric"}},
                {"column_name": "n", "action": "convert_type", "parameters": {"target_type": "string"}}
            ]
        })
        .to_string(),
    )
    .unwrap();
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(out.column("raw").unwrap().data_type(), DataType::Int64);
    assert_eq!(values(&out, "raw"), vec![Scalar::Int(1), Scalar::Null, Scalar::Int(3)]);
    assert_eq!(out.column("n").unwrap().data_type(), DataType::String);
    assert_eq!(
        values(&out, "n"),
        vec![Scalar::Text("7".into()), Scalar::Null, Scalar::Text("9".into())]
    );
    assert_eq!(log.entries()[1], "Converted 'n' to string");
}

#[test]
fn average_and_date_part_features() {
    let df = DataFrame::from_columns(
        "orders",
        vec![
            ("placed", Column::from(vec![Some("2024-03-05"), Some("2023-12-31"), None])),
            ("qty", Column::from(vec![Some(1i64), Some(2), None])),
            ("extra", Column::from(vec![Some(10i64), None, None])),
        ],
    )
    .unwrap();
    let rec = ProcessingRecommendation {
        feature_engineering: vec![
            FeatureSpec::new("mean_qty", FeatureOperation::Average, ["qty", "extra"]),
            FeatureSpec::new("month", FeatureOperation::ExtractMonth, ["placed"]),
            FeatureSpec::new("day", FeatureOperation::ExtractDay, ["placed"]),
        ],
        ..ProcessingRecommendation::default()
    };
    let (out, _) = TransformationPipeline::new().run(&df, &rec);
    assert_eq!(
        values(&out, "mean_qty"),
        vec![Scalar::Float(5.5), Scalar::Float(2.0), Scalar::Null]
    );
    assert_eq!(
        values(&out, "month"),
        vec![Scalar::Int(3), Scalar::Int(12), Scalar::Null]
    );
    assert_eq!(values(&out, "day"), vec![Scalar::Int(5), Scalar::Int(31), Scalar::Null]);
}

#[test]
fn overflowing_integer_sum_widens_to_float() {
    let df = DataFrame::from_columns(
        "big",
        vec![
            ("a", Column::from(vec![Some(i64::MAX), Some(1)])),
            ("b", Column::from(vec![Some(1i64), Some(2)])),
        ],
    )
    .unwrap();
    let rec = ProcessingRecommendation {
        feature_engineering: vec![FeatureSpec::new("total", FeatureOperation::Sum, ["a", "b"])],
        ..ProcessingRecommendation::default()
    };
    let (out, log) = TransformationPipeline::new().run(&df, &rec);
    let total = out.column("total").unwrap();
    assert_eq!(total.data_type(), DataType::Float64);
    assert_eq!(values(&out, "total")[1], Scalar::Float(3.0));
    assert!(total.to_f64(0).is_some_and(|v| v > 9.2e18));
    assert!(!log.entries()[0].starts_with("Error"));
}
