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

use crate::chart::ChartType;
use crate::frame::FrameError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Dataset error: {0}")]
    Frame(#[from] FrameError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
    #[error("Recommendation generator unavailable: {0}")]
    Generator(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported file type: {extension}")]
    Unsupported { extension: String },
    #[error("File type '{extension}' is not allowed; allowed types: {allowed}")]
    NotAllowed { extension: String, allowed: String },
    #[error("File size {size_mb:.2}MB exceeds the {limit_mb}MB limit")]
    TooLarge { size_mb: f64, limit_mb: u64 },
    #[error("Empty input: {0}")]
    Empty(String),
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed input: {0}")]
    Malformed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Unknown chart type: '{0}'")]
    UnknownChartType(String),
    #[error("Column '{column}' required by the chart is not in the dataset")]
    MissingColumn { column: String },
    #[error("Invalid chart request: {0}")]
    InvalidRequest(String),
    #[error("Chart '{chart_type}' is not compatible with the selected data: {reason}")]
    Incompatible {
        chart_type: ChartType,
        reason: String,
        alternatives: Vec<ChartType>,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
    #[error("Column '{column}' is not numeric")]
    NotNumeric { column: String },
    #[error("{0}")]
    InvalidParameters(String),
    #[error("Invalid filter criterion: {0}")]
    InvalidCriterion(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Chart not found: {0}")]
    ChartNotFound(String),
    #[error("Failed to acquire store lock")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {field} = {value}")]
    OutOfRange { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, EaselError>;
pub type LoadResult<T> = std::result::Result<T, LoadError>;
pub type ChartResult<T> = std::result::Result<T, ChartError>;
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// How a failure reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Malformed request, rejected before any processing.
    Structural,
    /// A single pipeline step failed; the run continues.
    StepLocal,
    /// Nothing usable can be returned.
    Fatal,
}

impl EaselError {
    pub fn severity(&self) -> Severity {
        match self {
            EaselError::Chart(ChartError::MissingColumn { .. }) => Severity::Fatal,
            EaselError::Chart(_) | EaselError::Serialisation(_) => Severity::Structural,
            EaselError::Pipeline(_) => Severity::StepLocal,
            _ => Severity::Fatal,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EaselError::Chart(ChartError::Incompatible { .. })
                | EaselError::Pipeline(_)
                | EaselError::Load(LoadError::TooLarge { .. })
                | EaselError::Load(LoadError::NotAllowed { .. })
                | EaselError::Generator(_)
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            EaselError::Frame(_) => "Dataset",
            EaselError::Load(_) => "Load",
            EaselError::Chart(_) => "Chart",
            EaselError::Pipeline(_) => "Pipeline",
            EaselError::Store(_) => "Store",
            EaselError::Config(_) => "Configuration",
            EaselError::Serialisation(_) => "Serialisation",
            EaselError::Generator(_) => "Recommendation",
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            EaselError::Chart(ChartError::Incompatible { alternatives, .. })
                if !alternatives.is_empty() =>
            {
                let names: Vec<_> = alternatives.iter().map(|c| c.as_str()).collect();
                vec![format!("Try one of: {}", names.join(", "))]
            }
            EaselError::Chart(ChartError::MissingColumn { .. }) => vec![
                "Check the column name spelling".to_string(),
                "Profile the dataset to list available columns".to_string(),
            ],
            EaselError::Load(LoadError::TooLarge { .. }) => {
                vec!["Split the file or raise limits.max_file_size_mb".to_string()]
            }
            EaselError::Store(StoreError::SessionNotFound(_)) => {
                vec!["Upload the dataset again to start a new session".to_string()]
            }
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            EaselError::Chart(ChartError::Incompatible { reason, .. }) => reason.clone(),
            EaselError::Load(LoadError::Empty(_)) => {
                "The file appears to be empty. Please provide data with at least one row.".to_string()
            }
            EaselError::Store(StoreError::SessionNotFound(_)) => {
                "Session not found. Please upload your data again.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_error_kind() {
        let missing: EaselError = ChartError::MissingColumn {
            column: "x".into(),
        }
        .into();
        assert_eq!(missing.severity(), Severity::Fatal);

        let incompatible: EaselError = ChartError::Incompatible {
            chart_type: ChartType::Pie,
            reason: "bad".into(),
            alternatives: vec![ChartType::Donut, ChartType::Bar],
        }
        .into();
        assert_eq!(incompatible.severity(), Severity::Structural);
        assert!(incompatible.is_recoverable());
        assert_eq!(incompatible.user_message(), "bad");
        assert_eq!(incompatible.suggestions(), vec!["Try one of: donut, bar".to_string()]);
    }
}
