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

//! Dataset profiling, recommendation-driven transformation, and chart
//! compatibility checks with per-family data shaping.

pub mod chart;
pub mod config;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod recommend;
pub mod recommendation;
pub mod schema;
pub mod service;
pub mod stats;
pub mod store;
pub mod validators;

pub use chart::{
    chart_type_catalog, suggest_optimal_chart, suggest_visualizations, ChartCompatibilityEngine,
    ChartDataPreparer, ChartRequest, ChartType, ChartTypeInfo, CompatibilityResult, SemanticType,
    VisualizationSuggestion, VisualizationSuggestions,
};
pub use config::EaselConfig;
pub use error::{
    ChartError, ConfigError, EaselError, LoadError, PipelineError, Result, Severity, StoreError,
};
pub use frame::{Column, ColumnData, DataFrame, DataType, Record, Scalar};
pub use io::{infer_file_type, load_bytes, load_path, DatasetLoader, FileFormat};
pub use pipeline::{CustomOperation, FilterCondition, ProcessingLog, TransformationPipeline};
pub use recommend::{KeywordRecommender, RecommendationGenerator, StaticRecommender};
pub use recommendation::{
    CleaningAction, CleaningStep, FeatureOperation, FeatureSpec, ProcessingRecommendation,
};
pub use schema::{ColumnProfile, DatasetStatistics, SchemaAnalyzer, SchemaProfile};
pub use service::{ChartConversion, ChartData, CreateChartRequest, DashboardService};
pub use store::{ChartStore, DatasetStore, InMemoryChartStore, InMemoryDatasetStore};
pub use validators::{validate_chart_data, ChartDataValidation};
