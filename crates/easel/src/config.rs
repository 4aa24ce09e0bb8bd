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

use crate::error::{ConfigError, ConfigResult};
use crate::frame::DEFAULT_TEMPORAL_FORMATS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MAX_FILE_SIZE_ENV: &str = "EASEL_MAX_FILE_SIZE_MB";
pub const ALLOWED_FILE_TYPES_ENV: &str = "EASEL_ALLOWED_FILE_TYPES";

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct EaselConfig {
    pub limits: LimitsConfigSection,
    pub profiling: ProfilingConfigSection,
    pub pipeline: PipelineConfigSection,
    pub charts: ChartsConfigSection,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LimitsConfigSection {
    pub max_file_size_mb: u64,
    pub allowed_file_types: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ProfilingConfigSection {
    pub sample_size: usize,
    pub categorical_max_unique: usize,
    pub categorical_ratio: f64,
    pub temporal_formats: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PipelineConfigSection {
    pub default_zscore_threshold: f64,
    pub default_bins: usize,
    pub default_fill_value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ChartsConfigSection {
    pub pie_max_categories: usize,
    pub max_alternatives: usize,
}

impl EaselConfig {
    pub fn load_from_file(config_path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.display().to_string(),
            source,
        })?;
        let config: EaselConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config/easel.toml")
    }

    /// Reads the default config file if present, then applies environment
    /// overrides (a `.env` file is honoured).
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        let mut config = match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(ConfigError::Read { .. }) => Self::default(),
            Err(e) => {
                warn!("Ignoring {}: {e}", config_path.display());
                Self::default()
            }
        };
        let _ = dotenvy::dotenv();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(MAX_FILE_SIZE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(mb) if mb > 0 => {
                    debug!("{MAX_FILE_SIZE_ENV} overrides max_file_size_mb = {mb}");
                    self.limits.max_file_size_mb = mb;
                }
                _ => warn!("Ignoring invalid {MAX_FILE_SIZE_ENV}={raw}"),
            }
        }
        if let Some(raw) = lookup(ALLOWED_FILE_TYPES_ENV) {
            let types: Vec<String> = raw
                .split(',')
                .map(|t| t.trim().trim_start_matches('.').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            if types.is_empty() {
                warn!("Ignoring empty {ALLOWED_FILE_TYPES_ENV}");
            } else {
                self.limits.allowed_file_types = types;
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let out_of_range = |field: &str, value: String| ConfigError::OutOfRange {
            field: field.to_string(),
            value,
        };
        if self.limits.max_file_size_mb == 0 {
            return Err(out_of_range("limits.max_file_size_mb", "0".into()));
        }
        if self.limits.allowed_file_types.is_empty() {
            return Err(out_of_range("limits.allowed_file_types", "[]".into()));
        }
        let ratio = self.profiling.categorical_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(out_of_range("profiling.categorical_ratio", ratio.to_string()));
        }
        if self.pipeline.default_zscore_threshold <= 0.0 {
            return Err(out_of_range(
                "pipeline.default_zscore_threshold",
                self.pipeline.default_zscore_threshold.to_string(),
            ));
        }
        if self.pipeline.default_bins == 0 {
            return Err(out_of_range("pipeline.default_bins", "0".into()));
        }
        Ok(())
    }

    /// Saturates at `u64::MAX` for very large limits.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.limits.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_lowercase();
        self.limits
            .allowed_file_types
            .iter()
            .any(|allowed| *allowed == extension)
    }
}

impl Default for LimitsConfigSection {
    fn default() -> Self {
        Self {
            max_file_size_mb: 50,
            allowed_file_types: ["csv", "xlsx", "xls", "json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for ProfilingConfigSection {
    fn default() -> Self {
        Self {
            sample_size: 5,
            categorical_max_unique: 50,
            categorical_ratio: 0.1,
            temporal_formats: DEFAULT_TEMPORAL_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for PipelineConfigSection {
    fn default() -> Self {
        Self {
            default_zscore_threshold: 3.0,
            default_bins: 5,
            default_fill_value: "Unknown".to_string(),
        }
    }
}

impl Default for ChartsConfigSection {
    fn default() -> Self {
        Self {
            pie_max_categories: 8,
            max_alternatives: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: EaselConfig = toml::from_str("[limits]\nmax_file_size_mb = 10\n").unwrap();
        assert_eq!(config.limits.max_file_size_mb, 10);
        assert_eq!(config.limits.allowed_file_types.len(), 4);
        assert_eq!(config.charts.pie_max_categories, 8);
        assert_eq!(config.pipeline.default_fill_value, "Unknown");
    }

    #[test]
    fn env_overrides_apply_and_ignore_garbage() {
        let mut config = EaselConfig::default();
        config.apply_env_overrides(|key| match key {
            MAX_FILE_SIZE_ENV => Some("abc".into()),
            ALLOWED_FILE_TYPES_ENV => Some(" CSV, .json ".into()),
            _ => None,
        });
        assert_eq!(config.limits.max_file_size_mb, 50);
        assert_eq!(config.limits.allowed_file_types, vec!["csv", "json"]);
        assert!(config.is_allowed_extension(".CSV"));
        assert!(!config.is_allowed_extension("xlsx"));
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let mut config = EaselConfig::default();
        config.profiling.categorical_ratio = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn huge_size_limits_saturate() {
        let mut config = EaselConfig::default();
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
        config.limits.max_file_size_mb = u64::MAX;
        assert_eq!(config.max_file_size_bytes(), u64::MAX);
    }
}
