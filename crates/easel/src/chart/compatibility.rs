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

use crate::chart::types::{describe_types, ChartType, SemanticType};
use crate::config::EaselConfig;
use crate::schema::ColumnProfile;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    pub is_compatible: bool,
    pub reason: String,
    pub suggested_alternatives: Vec<ChartType>,
}

/// Checks a chart request against the requirement table and a schema profile.
#[derive(Debug, Clone)]
pub struct ChartCompatibilityEngine {
    max_alternatives: usize,
}

impl Default for ChartCompatibilityEngine {
    fn default() -> Self {
        Self {
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
        }
    }
}

impl ChartCompatibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EaselConfig) -> Self {
        Self {
            max_alternatives: config.charts.max_alternatives,
        }
    }

    /// Columns absent from `columns` skip the type checks; only dimension
    /// bounds apply to them.
    pub fn validate<S: AsRef<str>>(
        &self,
        chart_type: ChartType,
        x_axis: &str,
        y_axes: &[S],
        columns: &[ColumnProfile],
    ) -> CompatibilityResult {
        let Some(requirement) = chart_type.requirement() else {
            return CompatibilityResult {
                is_compatible: true,
                reason: "No specific requirements for this chart type".to_string(),
                suggested_alternatives: Vec::new(),
            };
        };

        let mut issues = Vec::new();
        let dimensions = 1 + y_axes.len();
        if dimensions < requirement.min_dimensions {
            issues.push(format!(
                "Chart requires at least {} dimensions, but only {dimensions} provided",
                requirement.min_dimensions
            ));
        }
        if dimensions > requirement.max_dimensions {
            issues.push(format!(
                "Chart supports at most {} dimensions, but {dimensions} provided",
                requirement.max_dimensions
            ));
        }

        let profile_of = |name: &str| columns.iter().find(|c| c.name == name);
        if let Some(x_profile) = profile_of(x_axis) {
            if !satisfies(requirement.x_types, x_profile) {
                issues.push(format!(
                    "X-axis '{x_axis}' type doesn't match requirements: {}",
                    describe_types(requirement.x_types)
                ));
            }
        }
        for y_profile in y_axes.iter().filter_map(|y| profile_of(y.as_ref())) {
            if !satisfies(requirement.y_types, y_profile) {
                issues.push(format!(
                    "Y-axis '{}' type doesn't match requirements: {}",
                    y_profile.name,
                    describe_types(requirement.y_types)
                ));
            }
        }

        let suggested_alternatives: Vec<ChartType> = chart_type
            .related()
            .iter()
            .take(self.max_alternatives)
            .copied()
            .collect();
        debug!("{chart_type} validation found {} issues", issues.len());
        if issues.is_empty() {
            CompatibilityResult {
                is_compatible: true,
                reason: format!("Chart type '{chart_type}' is compatible with the selected data"),
                suggested_alternatives,
            }
        } else {
            CompatibilityResult {
                is_compatible: false,
                reason: issues.join("; "),
                suggested_alternatives,
            }
        }
    }

    /// Full, untruncated row of the compatibility graph.
    pub fn compatible_alternatives(&self, chart_type: ChartType) -> Vec<ChartType> {
        chart_type.related().to_vec()
    }
}

fn satisfies(types: &[SemanticType], profile: &ColumnProfile) -> bool {
    types.is_empty() || types.iter().any(|t| t.is_satisfied_by(profile))
}
