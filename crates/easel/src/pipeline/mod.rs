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

//! Applies a recommendation document to a dataset in four fixed stages:
//! column drops, cleaning steps, feature engineering, then row filters.
//!
//! A failing step is recorded in the run's [`ProcessingLog`] and leaves the
//! dataset as it was before that step; the run always completes.
//! [`TransformationPipeline::apply_operations`] runs ad-hoc operations under
//! the same rule.

pub mod cleaning;
pub mod custom;
pub mod features;
pub mod filtering;
pub mod log;

pub use custom::{CustomOperation, FilterCondition};
pub use filtering::{Comparison, FilterCriterion};
pub use log::ProcessingLog;

use crate::config::EaselConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::DataFrame;
use crate::recommendation::{CleaningStep, FeatureSpec, ProcessingRecommendation};
use tracing::{debug, info};

/// Defaults used when a step omits its parameters.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub zscore_threshold: f64,
    pub default_bins: usize,
    pub default_fill_value: String,
    pub temporal_formats: Vec<String>,
}

impl From<&EaselConfig> for PipelineSettings {
    fn from(config: &EaselConfig) -> Self {
        Self {
            zscore_threshold: config.pipeline.default_zscore_threshold,
            default_bins: config.pipeline.default_bins,
            default_fill_value: config.pipeline.default_fill_value.clone(),
            temporal_formats: config.profiling.temporal_formats.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&EaselConfig::default())
    }
}

/// Result of one step that did not fail.
#[derive(Debug)]
pub enum StepOutcome {
    Applied(DataFrame, String),
    /// The step does not apply to this data; the dataset is unchanged.
    Skipped(String),
}

#[derive(Debug, Clone, Default)]
pub struct TransformationPipeline {
    settings: PipelineSettings,
}

impl TransformationPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EaselConfig) -> Self {
        Self::with_settings(PipelineSettings::from(config))
    }

    pub fn with_settings(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs every stage against a copy of `dataset`. The returned log ends
    /// with the final row and column counts.
    pub fn run(
        &self,
        dataset: &DataFrame,
        recommendation: &ProcessingRecommendation,
    ) -> (DataFrame, ProcessingLog) {
        let mut log = ProcessingLog::new();
        let mut df = dataset.clone();

        if !recommendation.columns_to_drop.is_empty() {
            df = self.drop_columns(df, &recommendation.columns_to_drop, &mut log);
        }
        df = self.apply_cleaning(df, &recommendation.cleaning_steps, &mut log);
        df = self.apply_feature_engineering(df, &recommendation.feature_engineering, &mut log);
        df = self.apply_filtering(df, &recommendation.filtering_criteria, &mut log);

        record_final_shape(&df, &mut log);
        (df, log)
    }

    /// Applies `operations` in order to a copy of `dataset`.
    pub fn apply_operations(
        &self,
        dataset: &DataFrame,
        operations: &[CustomOperation],
    ) -> (DataFrame, ProcessingLog) {
        let mut log = ProcessingLog::new();
        let mut df = dataset.clone();
        for operation in operations {
            df = apply_logged(df, &mut log, |current| custom::apply_operation(current, operation, &self.settings), |e| {
                format!("Error in {operation}: {e}")
            });
        }
        record_final_shape(&df, &mut log);
        (df, log)
    }

    /// Drops the listed columns that exist; unknown names are ignored.
    pub fn drop_columns(
        &self,
        mut df: DataFrame,
        columns: &[String],
        log: &mut ProcessingLog,
    ) -> DataFrame {
        let dropped = columns.iter().filter(|name| df.drop_column(name)).count();
        debug!("Dropped {dropped} of {} requested columns", columns.len());
        log.record(format!("Dropped columns: {columns:?}"));
        df
    }

    pub fn apply_cleaning(
        &self,
        mut df: DataFrame,
        steps: &[CleaningStep],
        log: &mut ProcessingLog,
    ) -> DataFrame {
        for step in steps {
            df = apply_logged(df, log, |current| cleaning::apply_step(current, step, &self.settings), |e| {
                format!("Error in {} on '{}': {e}", step.action, step.column_name)
            });
        }
        df
    }

    pub fn apply_feature_engineering(
        &self,
        mut df: DataFrame,
        features: &[FeatureSpec],
        log: &mut ProcessingLog,
    ) -> DataFrame {
        for feature in features {
            df = apply_logged(df, log, |current| features::apply_feature(current, feature, &self.settings), |e| {
                format!("Error creating '{}': {e}", feature.new_column_name)
            });
        }
        df
    }

    pub fn apply_filtering(
        &self,
        mut df: DataFrame,
        criteria: &[String],
        log: &mut ProcessingLog,
    ) -> DataFrame {
        for criterion in criteria {
            df = apply_logged(
                df,
                log,
                |current| {
                    let parsed: FilterCriterion = criterion.parse()?;
                    let filtered = parsed.apply(current)?;
                    Ok(StepOutcome::Applied(filtered, format!("Applied filter: {parsed}")))
                },
                |e| format!("Error applying filter '{criterion}': {e}"),
            );
        }
        df
    }
}

fn record_final_shape(df: &DataFrame, log: &mut ProcessingLog) {
    info!(
        "Processing complete. Final shape: ({}, {})",
        df.row_count(),
        df.column_count()
    );
    log.record(format!(
        "Final dataset: {} rows, {} columns",
        df.row_count(),
        df.column_count()
    ));
}

fn apply_logged<S, E>(df: DataFrame, log: &mut ProcessingLog, step: S, describe_error: E) -> DataFrame
where
    S: FnOnce(&DataFrame) -> PipelineResult<StepOutcome>,
    E: FnOnce(&PipelineError) -> String,
{
    match step(&df) {
        Ok(StepOutcome::Applied(next, entry)) => {
            log.record(entry);
            next
        }
        Ok(StepOutcome::Skipped(entry)) => {
            log.record(entry);
            df
        }
        Err(e) => {
            log.record_error(describe_error(&e));
            df
        }
    }
}
