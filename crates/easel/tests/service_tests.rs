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

use easel::chart::ChartType;
use easel::config::EaselConfig;
use easel::error::{ChartError, EaselError, LoadError, Severity, StoreError};
use easel::pipeline::CustomOperation;
use easel::recommendation::ProcessingRecommendation;
use easel::recommend::{KeywordRecommender, RecommendationGenerator, StaticRecommender};
use easel::schema::SchemaProfile;
use easel::service::{ChartConversion, CreateChartRequest, DashboardService};
use serde_json::json;
use std::sync::Arc;

const CSV: &str = "region,month,revenue,units\n\
north,2024-01-01,100.5,3\n\
south,2024-02-01,80,\n\
north,2024-03-01,120,5\n\
west,2024-04-01,,2\n";

fn session(service: &DashboardService) -> String {
    service.upload("sales.csv", CSV.as_bytes()).unwrap().session_id
}

fn request(session_id: &str, chart_type: ChartType, x: &str, y: &[&str]) -> CreateChartRequest {
    CreateChartRequest {
        session_id: session_id.to_string(),
        chart_type,
        title: "Revenue".into(),
        x_axis: x.into(),
        y_axis: y.iter().map(|s| s.to_string()).collect(),
        filters: None,
    }
}

#[test]
fn upload_profiles_and_previews() {
    let service = DashboardService::new(EaselConfig::default());
    let summary = service.upload("sales.csv", CSV.as_bytes()).unwrap();
    assert_eq!(summary.schema.row_count, 4);
    assert_eq!(summary.preview.len(), 4);
    assert_eq!(summary.preview[0]["region"], json!("north"));

    let metadata = service.session(&summary.session_id).unwrap();
    assert_eq!(metadata.file_name, "sales.csv");
    assert_eq!(metadata.column_count, 4);
}

#[test]
fn upload_rejects_disallowed_files() {
    let service = DashboardService::new(EaselConfig::default());
    let err = service.upload("notes.txt", b"hello").unwrap_err();
    assert!(matches!(err, EaselError::Load(LoadError::NotAllowed { .. })));
}

#[test]
fn processing_replaces_the_working_dataset() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let rec = ProcessingRecommendation::from_json(
        &json!({
            "columns_to_drop": ["units"],
            "cleaning_steps": [
                {"column_name": "revenue", "action": "fill_nulls", "parameters": {"method": "median"}}
            ],
            "filtering_criteria": ["revenue > 90"]
        })
        .to_string(),
    )
    .unwrap();
    let summary = service.process(&id, &rec).unwrap();
    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.columns, vec!["region", "month", "revenue"]);
    assert_eq!(summary.processing_log.len(), 4);
    assert_eq!(service.preview(&id, Some(1)).unwrap().len(), 1);
    assert_eq!(service.schema(&id).unwrap().column_count, 3);

    let reset = service.reset_processing(&id).unwrap();
    assert_eq!(reset.row_count, 4);
    assert!(reset.processing_log.is_empty());
    assert_eq!(service.schema(&id).unwrap().column_count, 4);
}

#[test]
fn processing_always_starts_from_the_original() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let drop_units = ProcessingRecommendation {
        columns_to_drop: vec!["units".into()],
        ..ProcessingRecommendation::default()
    };
    service.process(&id, &drop_units).unwrap();
    let summary = service.process(&id, &ProcessingRecommendation::default()).unwrap();
    assert_eq!(summary.column_count, 4);
}

#[test]
fn creates_and_stores_charts() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let chart = service
        .create_chart(&request(&id, ChartType::Pie, "region", &["units"]))
        .unwrap();
    assert_eq!(chart.description, "Revenue - pie chart");
    assert_eq!(chart.compatible_types, vec![ChartType::Donut, ChartType::Bar]);
    assert_eq!(
        serde_json::to_value(&chart.data).unwrap(),
        json!([
            {"region": "north", "units": 8},
            {"region": "south", "units": 0},
            {"region": "west", "units": 2}
        ])
    );
    let saved = service.session_charts(&id).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, chart.chart_id);
}

#[test]
fn missing_axis_column_is_fatal() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let err = service
        .create_chart(&request(&id, ChartType::Bar, "region", &["profit"]))
        .unwrap_err();
    assert!(matches!(
        &err,
        EaselError::Chart(ChartError::MissingColumn { column }) if column == "profit"
    ));
    assert_eq!(err.severity(), Severity::Fatal);
}

#[test]
fn incompatible_chart_is_rejected_with_alternatives() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let err = service
        .create_chart(&request(&id, ChartType::Scatter, "region", &["revenue"]))
        .unwrap_err();
    match err {
        EaselError::Chart(ChartError::Incompatible {
            chart_type,
            reason,
            alternatives,
        }) => {
            assert_eq!(chart_type, ChartType::Scatter);
            assert_eq!(reason, "X-axis 'region' type doesn't match requirements: [numeric]");
            assert_eq!(
                alternatives,
                vec![ChartType::Line, ChartType::Bubble, ChartType::Area]
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.session_charts(&id).unwrap().is_empty());
}

#[test]
fn converting_a_chart_saves_a_new_one() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let bar = service
        .create_chart(&request(&id, ChartType::Bar, "region", &["revenue"]))
        .unwrap();

    match service.convert_chart(&bar.chart_id, ChartType::Donut).unwrap() {
        ChartConversion::Converted(donut) => {
            assert_ne!(donut.chart_id, bar.chart_id);
            assert_eq!(donut.chart_type, ChartType::Donut);
            assert_eq!(donut.data.len(), 3);
        }
        ChartConversion::Rejected(result) => panic!("unexpected rejection: {}", result.reason),
    }

    match service.convert_chart(&bar.chart_id, ChartType::Scatter).unwrap() {
        ChartConversion::Rejected(result) => {
            assert!(!result.is_compatible);
            assert!(result.reason.contains("X-axis 'region'"));
        }
        ChartConversion::Converted(_) => panic!("scatter needs a numeric x-axis"),
    }
    assert_eq!(service.session_charts(&id).unwrap().len(), 2);
}

#[test]
fn unknown_session_and_chart_are_store_errors() {
    let service = DashboardService::new(EaselConfig::default());
    assert!(matches!(
        service.preview("nope", None),
        Err(EaselError::Store(StoreError::SessionNotFound(_)))
    ));
    assert!(matches!(
        service.convert_chart("nope", ChartType::Bar),
        Err(EaselError::Store(StoreError::ChartNotFound(_)))
    ));
}

#[test]
fn recommendations_come_from_the_configured_generator() {
    let fixed = StaticRecommender::from_json(r#"{"columns_to_drop": ["units"]}"#).unwrap();
    let service = DashboardService::new(EaselConfig::default()).with_recommender(Arc::new(fixed));
    let id = session(&service);
    let rec = service.recommend(&id, "monthly revenue trend").unwrap();
    assert_eq!(rec.columns_to_drop, vec!["units"]);
    assert_eq!(
        service.session(&id).unwrap().use_case.as_deref(),
        Some("monthly revenue trend")
    );
}

#[test]
fn chart_data_validation_reports_problems() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let result = service
        .validate_chart_data(&id, "region", &["revenue".into(), "ghost".into()])
        .unwrap();
    assert!(!result.valid);
    assert_eq!(result.errors, vec!["Y-axis column 'ghost' not found"]);
    assert_eq!(result.warnings, vec!["Y-axis column 'revenue' has 1 null values"]);
}

struct OfflineGenerator;

impl RecommendationGenerator for OfflineGenerator {
    fn recommend(
        &self,
        _use_case: &str,
        _profile: &SchemaProfile,
    ) -> easel::Result<ProcessingRecommendation> {
        Err(EaselError::Generator("model offline".into()))
    }
}

fn operations(value: serde_json::Value) -> Vec<CustomOperation> {
    serde_json::from_value(value).unwrap()
}

#[test]
fn failing_generator_falls_back_to_keyword_selection() {
    let service =
        DashboardService::new(EaselConfig::default()).with_recommender(Arc::new(OfflineGenerator));
    let id = session(&service);
    let rec = service.recommend(&id, "revenue by region").unwrap();
    let profile = service.schema(&id).unwrap();
    assert_eq!(rec, KeywordRecommender::new().select("revenue by region", &profile));
}

#[test]
fn custom_operations_run_in_order_on_the_original() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let summary = service
        .custom_process(
            &id,
            &operations(json!([
                {"type": "fill_nulls", "column": "revenue", "method": "median"},
                {"type": "filter", "column": "revenue", "condition": "gt", "value": 90},
                {"type": "sort", "column": "revenue", "ascending": false},
                {"type": "drop_column", "column": "units"},
                {"type": "drop_column", "column": "ghost"}
            ])),
        )
        .unwrap();
    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.columns, vec!["region", "month", "revenue"]);
    assert_eq!(summary.preview[0]["revenue"], json!(120.0));
    assert_eq!(summary.preview[2]["region"], json!("west"));
    assert_eq!(summary.processing_log.len(), 6);
    assert!(summary.processing_log[4].contains("'ghost'"));
    assert_eq!(service.processing_log(&id).unwrap(), summary.processing_log);

    let regions = service
        .custom_process(
            &id,
            &operations(json!([
                {"type": "filter", "column": "region", "condition": "in", "value": ["south", "west"]}
            ])),
        )
        .unwrap();
    assert_eq!(regions.row_count, 2);
    assert_eq!(regions.column_count, 4);
}

#[test]
fn not_equal_filter_keeps_nulls() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let summary = service
        .custom_process(
            &id,
            &operations(json!([{"type": "filter", "column": "units", "condition": "ne", "value": 3}])),
        )
        .unwrap();
    assert_eq!(summary.row_count, 3);
    assert_eq!(summary.preview[0]["region"], json!("south"));
}

#[test]
fn processing_log_is_kept_until_reset() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    assert!(service.processing_log(&id).unwrap().is_empty());
    let rec = ProcessingRecommendation {
        columns_to_drop: vec!["units".into()],
        ..ProcessingRecommendation::default()
    };
    let summary = service.process(&id, &rec).unwrap();
    assert_eq!(service.processing_log(&id).unwrap(), summary.processing_log);
    service.reset_processing(&id).unwrap();
    assert!(service.processing_log(&id).unwrap().is_empty());
}

#[test]
fn charts_can_be_fetched_and_deleted() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let pie = service
        .create_chart(&request(&id, ChartType::Pie, "region", &["units"]))
        .unwrap();
    let saved = service.chart(&pie.chart_id).unwrap();
    assert_eq!(saved.chart_type, ChartType::Pie);
    assert_eq!(saved.session_id, id);

    assert!(service.delete_chart(&pie.chart_id).unwrap());
    assert!(!service.delete_chart(&pie.chart_id).unwrap());
    assert!(service.session_charts(&id).unwrap().is_empty());
}

#[test]
fn deleting_a_session_removes_its_charts() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let other = session(&service);
    let bar = service
        .create_chart(&request(&id, ChartType::Bar, "region", &["revenue"]))
        .unwrap();
    let kept = service
        .create_chart(&request(&other, ChartType::Bar, "region", &["revenue"]))
        .unwrap();

    assert!(service.delete_session(&id).unwrap());
    assert!(matches!(
        service.chart(&bar.chart_id),
        Err(EaselError::Store(StoreError::ChartNotFound(_)))
    ));
    assert!(matches!(
        service.convert_chart(&bar.chart_id, ChartType::Donut),
        Err(EaselError::Store(StoreError::ChartNotFound(_)))
    ));
    assert!(service.chart(&kept.chart_id).is_ok());
    assert!(!service.delete_session(&id).unwrap());
}

#[test]
fn suggests_starter_charts_from_column_roles() {
    let service = DashboardService::new(EaselConfig::default());
    let id = session(&service);
    let suggestions = service.suggest_visualizations(&id).unwrap();
    assert_eq!(suggestions.summary, "Basic visualization suggestions based on data types");
    assert_eq!(suggestions.charts.len(), 2);

    let scatter = &suggestions.charts[0];
    assert_eq!(scatter.chart_type, ChartType::Scatter);
    assert_eq!(scatter.title, "revenue vs units");
    assert_eq!(scatter.y_axis, vec!["units"]);
    assert_eq!(scatter.compatible_types, vec![ChartType::Line, ChartType::Area]);
    assert_eq!(
        scatter.incompatible_types,
        vec!["bubble: Chart requires at least 3 dimensions, but only 2 provided"]
    );

    let bar = &suggestions.charts[1];
    assert_eq!(bar.chart_type, ChartType::Bar);
    assert_eq!(bar.title, "region Distribution");
    assert_eq!(bar.x_axis, "region");
    assert_eq!(bar.y_axis, vec!["revenue"]);
    assert!(bar.compatible_types.is_empty());
    assert!(bar.incompatible_types[0].starts_with("horizontal_bar: "));
}

#[test]
fn lists_chart_types() {
    let service = DashboardService::new(EaselConfig::default());
    let catalog = service.chart_types();
    assert_eq!(catalog.len(), 13);
    assert_eq!(catalog[1].chart_type, ChartType::Bar);
    assert_eq!(catalog[1].name, "Bar Chart");
    assert_eq!(catalog[1].description, "Compare values across categories");
}
