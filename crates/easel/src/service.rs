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

//! Session-oriented facade over loading, processing and charting.

use crate::chart::{
    chart_type_catalog, suggest_visualizations, ChartCompatibilityEngine, ChartDataPreparer,
    ChartFilters, ChartType, ChartTypeInfo, CompatibilityResult, VisualizationSuggestions,
};
use crate::config::EaselConfig;
use crate::error::{ChartError, Result};
use crate::frame::{DataFrame, Record, DEFAULT_PREVIEW_ROWS};
use crate::io::{self, CsvWriter};
use crate::pipeline::{CustomOperation, ProcessingLog, TransformationPipeline};
use crate::recommend::{KeywordRecommender, RecommendationGenerator};
use crate::recommendation::ProcessingRecommendation;
use crate::schema::{DatasetStatistics, SchemaAnalyzer, SchemaProfile};
use crate::store::{
    ChartConfiguration, ChartStore, DatasetStore, InMemoryChartStore, InMemoryDatasetStore,
    SessionMetadata,
};
use crate::validators::{validate_chart_data, ChartDataValidation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    pub session_id: String,
    pub file_name: String,
    pub file_type: io::FileFormat,
    pub schema: SchemaProfile,
    pub preview: Vec<Record>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedSummary {
    pub session_id: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub preview: Vec<Record>,
    pub processing_log: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChartRequest {
    pub session_id: String,
    pub chart_type: ChartType,
    pub title: String,
    pub x_axis: String,
    pub y_axis: Vec<String>,
    #[serde(default)]
    pub filters: Option<ChartFilters>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSettings {
    pub filters: Option<ChartFilters>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub chart_id: String,
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub data: Vec<Record>,
    pub x_axis: String,
    pub y_axis: Vec<String>,
    pub compatible_types: Vec<ChartType>,
    pub configuration: ChartSettings,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChartConversion {
    Converted(ChartData),
    Rejected(CompatibilityResult),
}

pub struct DashboardService {
    config: EaselConfig,
    datasets: Arc<dyn DatasetStore>,
    charts: Arc<dyn ChartStore>,
    recommender: Arc<dyn RecommendationGenerator>,
    analyzer: SchemaAnalyzer,
    pipeline: TransformationPipeline,
    compatibility: ChartCompatibilityEngine,
    preparer: ChartDataPreparer,
}

impl DashboardService {
    pub fn new(config: EaselConfig) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryDatasetStore::new()),
            Arc::new(InMemoryChartStore::new()),
        )
    }

    pub fn with_stores(
        config: EaselConfig,
        datasets: Arc<dyn DatasetStore>,
        charts: Arc<dyn ChartStore>,
    ) -> Self {
        Self {
            analyzer: SchemaAnalyzer::from_config(&config.profiling),
            pipeline: TransformationPipeline::from_config(&config),
            compatibility: ChartCompatibilityEngine::from_config(&config),
            preparer: ChartDataPreparer::new(),
            recommender: Arc::new(KeywordRecommender::new()),
            config,
            datasets,
            charts,
        }
    }

    pub fn with_recommender(mut self, recommender: Arc<dyn RecommendationGenerator>) -> Self {
        self.recommender = recommender;
        self
    }

    pub fn config(&self) -> &EaselConfig {
        &self.config
    }

    /// Validates, parses and stores an uploaded file under a new session.
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadSummary> {
        let file_type = io::validate_upload(&self.config, file_name, bytes.len() as u64)?;
        let extension = io::file_extension(file_name).unwrap_or_default();
        let df = io::load_bytes(
            bytes,
            &extension,
            file_name,
            &self.config.profiling.temporal_formats,
        )?;
        let metadata = SessionMetadata::new(file_name, file_type, &df);
        let session_id = metadata.id.clone();
        let schema = self.analyzer.profile(&df);
        let preview = df.preview(DEFAULT_PREVIEW_ROWS);
        self.datasets.put_original(metadata, df)?;
        info!("Created session {session_id} for {file_name}");
        Ok(UploadSummary {
            session_id,
            file_name: file_name.to_string(),
            file_type,
            schema,
            preview,
        })
    }

    pub fn session(&self, session_id: &str) -> Result<SessionMetadata> {
        Ok(self.datasets.metadata(session_id)?)
    }

    /// Profile of the processed dataset when present, else the original.
    pub fn schema(&self, session_id: &str) -> Result<SchemaProfile> {
        let df = self.datasets.latest(session_id)?;
        Ok(self.analyzer.profile(&df))
    }

    pub fn preview(&self, session_id: &str, rows: Option<usize>) -> Result<Vec<Record>> {
        let df = self.datasets.latest(session_id)?;
        Ok(df.preview(rows.unwrap_or(DEFAULT_PREVIEW_ROWS)))
    }

    pub fn statistics(&self, session_id: &str) -> Result<DatasetStatistics> {
        let df = self.datasets.latest(session_id)?;
        Ok(self.analyzer.statistics(&df))
    }

    /// Records the use case on the session and asks the generator for a
    /// recommendation against the original dataset. A failing generator is
    /// replaced by keyword selection.
    pub fn recommend(&self, session_id: &str, use_case: &str) -> Result<ProcessingRecommendation> {
        self.datasets.set_use_case(session_id, use_case)?;
        let df = self.datasets.original(session_id)?;
        let profile = self.analyzer.profile(&df);
        match self.recommender.recommend(use_case, &profile) {
            Ok(recommendation) => Ok(recommendation),
            Err(e) => {
                warn!("Recommendation generator failed, using keyword selection: {e}");
                Ok(KeywordRecommender::new().select(use_case, &profile))
            }
        }
    }

    /// Runs the pipeline on the original dataset and stores the result as the
    /// session's processed dataset.
    pub fn process(
        &self,
        session_id: &str,
        recommendation: &ProcessingRecommendation,
    ) -> Result<ProcessedSummary> {
        let original = self.datasets.original(session_id)?;
        let (processed, log) = self.pipeline.run(&original, recommendation);
        self.store_processed(session_id, processed, log)
    }

    /// Applies ad-hoc operations to the original dataset and stores the
    /// result as the session's processed dataset.
    pub fn custom_process(
        &self,
        session_id: &str,
        operations: &[CustomOperation],
    ) -> Result<ProcessedSummary> {
        let original = self.datasets.original(session_id)?;
        let (processed, log) = self.pipeline.apply_operations(&original, operations);
        self.store_processed(session_id, processed, log)
    }

    /// Log of the run that produced the current processed dataset; empty
    /// when the session has not been processed.
    pub fn processing_log(&self, session_id: &str) -> Result<Vec<String>> {
        Ok(self.datasets.processing_log(session_id)?)
    }

    pub fn reset_processing(&self, session_id: &str) -> Result<ProcessedSummary> {
        self.datasets.clear_processed(session_id)?;
        let original = self.datasets.original(session_id)?;
        Ok(summarise(session_id, &original, Vec::new()))
    }

    /// Starter charts for the latest dataset, chosen from column roles.
    pub fn suggest_visualizations(&self, session_id: &str) -> Result<VisualizationSuggestions> {
        let profile = self.schema(session_id)?;
        Ok(suggest_visualizations(&profile, &self.compatibility))
    }

    pub fn chart_types(&self) -> Vec<ChartTypeInfo> {
        chart_type_catalog()
    }

    pub fn validate_chart(
        &self,
        session_id: &str,
        chart_type: ChartType,
        x_axis: &str,
        y_axes: &[String],
    ) -> Result<CompatibilityResult> {
        let profile = self.schema(session_id)?;
        Ok(self
            .compatibility
            .validate(chart_type, x_axis, y_axes, &profile.column_profiles))
    }

    pub fn validate_chart_data(
        &self,
        session_id: &str,
        x_axis: &str,
        y_axes: &[String],
    ) -> Result<ChartDataValidation> {
        let df = self.datasets.latest(session_id)?;
        Ok(validate_chart_data(&df, x_axis, y_axes))
    }

    /// Axis columns absent from the dataset are fatal; an incompatible
    /// selection is rejected with the reason and alternatives.
    pub fn create_chart(&self, request: &CreateChartRequest) -> Result<ChartData> {
        let df = self.datasets.latest(&request.session_id)?;
        for column in std::iter::once(&request.x_axis).chain(&request.y_axis) {
            if !df.has_column(column) {
                return Err(ChartError::MissingColumn {
                    column: column.clone(),
                }
                .into());
            }
        }
        let profile = self.analyzer.profile(&df);
        let verdict = self.compatibility.validate(
            request.chart_type,
            &request.x_axis,
            &request.y_axis,
            &profile.column_profiles,
        );
        if !verdict.is_compatible {
            warn!("Rejected {} chart: {}", request.chart_type, verdict.reason);
            return Err(ChartError::Incompatible {
                chart_type: request.chart_type,
                reason: verdict.reason,
                alternatives: verdict.suggested_alternatives,
            }
            .into());
        }
        self.render_and_save(
            &df,
            &request.session_id,
            request.chart_type,
            &request.title,
            &request.x_axis,
            &request.y_axis,
            request.filters.clone(),
        )
    }

    /// Re-targets a saved chart. A compatible target is saved as a new chart;
    /// the original configuration is left in place.
    pub fn convert_chart(&self, chart_id: &str, target: ChartType) -> Result<ChartConversion> {
        let saved = self.charts.get(chart_id)?;
        let df = self.datasets.latest(&saved.session_id)?;
        let profile = self.analyzer.profile(&df);
        let verdict = self.compatibility.validate(
            target,
            &saved.x_axis,
            &saved.y_axis,
            &profile.column_profiles,
        );
        if !verdict.is_compatible {
            return Ok(ChartConversion::Rejected(verdict));
        }
        let chart = self.render_and_save(
            &df,
            &saved.session_id,
            target,
            &saved.title,
            &saved.x_axis,
            &saved.y_axis,
            saved.filters.clone(),
        )?;
        Ok(ChartConversion::Converted(chart))
    }

    pub fn chart(&self, chart_id: &str) -> Result<ChartConfiguration> {
        Ok(self.charts.get(chart_id)?)
    }

    pub fn delete_chart(&self, chart_id: &str) -> Result<bool> {
        Ok(self.charts.delete(chart_id)?)
    }

    pub fn session_charts(&self, session_id: &str) -> Result<Vec<ChartConfiguration>> {
        self.datasets.metadata(session_id)?;
        Ok(self.charts.list(session_id)?)
    }

    pub fn export_csv(&self, session_id: &str, path: &Path) -> Result<()> {
        let df = self.datasets.latest(session_id)?;
        CsvWriter::new().write_file(&df, path)?;
        Ok(())
    }

    /// Removes the session's datasets and every chart saved against it.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let removed = self.charts.delete_for_session(session_id)?;
        let existed = self.datasets.delete(session_id)?;
        if existed {
            info!("Deleted session {session_id} and {removed} charts");
        }
        Ok(existed)
    }

    fn store_processed(
        &self,
        session_id: &str,
        processed: DataFrame,
        log: ProcessingLog,
    ) -> Result<ProcessedSummary> {
        let entries = log.into_entries();
        let summary = summarise(session_id, &processed, entries.clone());
        self.datasets.put_processed(session_id, processed, entries)?;
        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_and_save(
        &self,
        df: &DataFrame,
        session_id: &str,
        chart_type: ChartType,
        title: &str,
        x_axis: &str,
        y_axis: &[String],
        filters: Option<ChartFilters>,
    ) -> Result<ChartData> {
        let data = self
            .preparer
            .prepare(df, chart_type, x_axis, y_axis, filters.as_ref())?;
        let created_at = Utc::now();
        let chart_id = self.charts.save(ChartConfiguration {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            chart_type,
            title: title.to_string(),
            x_axis: x_axis.to_string(),
            y_axis: y_axis.to_vec(),
            filters: filters.clone(),
            data: data.clone(),
            created_at,
        })?;
        info!("Saved {chart_type} chart {chart_id} ({} records)", data.len());
        Ok(ChartData {
            chart_id,
            chart_type,
            title: title.to_string(),
            description: format!("{title} - {chart_type} chart"),
            data,
            x_axis: x_axis.to_string(),
            y_axis: y_axis.to_vec(),
            compatible_types: self.compatibility.compatible_alternatives(chart_type),
            configuration: ChartSettings { filters, created_at },
        })
    }
}

fn summarise(session_id: &str, df: &DataFrame, processing_log: Vec<String>) -> ProcessedSummary {
    ProcessedSummary {
        session_id: session_id.to_string(),
        row_count: df.row_count(),
        column_count: df.column_count(),
        columns: df.column_names().to_vec(),
        preview: df.preview(DEFAULT_PREVIEW_ROWS),
        processing_log,
    }
}
