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

use crate::chart::compatibility::ChartCompatibilityEngine;
use crate::chart::types::ChartType;
use crate::error::{ChartError, ChartResult};
use crate::schema::{ColumnProfile, SchemaProfile};
use serde::Serialize;

pub const DEFAULT_PIE_MAX_CATEGORIES: usize = 8;

/// Advisory default chart for an axis selection.
pub fn suggest_optimal_chart<S: AsRef<str>>(
    profile: &SchemaProfile,
    x_axis: &str,
    y_axes: &[S],
) -> ChartResult<ChartType> {
    suggest_optimal_chart_with(profile, x_axis, y_axes, DEFAULT_PIE_MAX_CATEGORIES)
}

/// Y columns missing from the profile count as non-numeric.
pub fn suggest_optimal_chart_with<S: AsRef<str>>(
    profile: &SchemaProfile,
    x_axis: &str,
    y_axes: &[S],
    pie_max_categories: usize,
) -> ChartResult<ChartType> {
    let x = profile.column(x_axis).ok_or_else(|| ChartError::MissingColumn {
        column: x_axis.to_string(),
    })?;
    // No measure to group, so a plain bar rather than a grouped one.
    if y_axes.is_empty() {
        return Ok(ChartType::Bar);
    }
    let ys: Vec<Option<&ColumnProfile>> = y_axes
        .iter()
        .map(|name| profile.column(name.as_ref()))
        .collect();
    let all_numeric = ys.iter().all(|y| y.is_some_and(|p| p.is_numeric));
    let single = ys.len() == 1;

    let suggestion = if x.is_temporal && single && all_numeric {
        ChartType::Line
    } else if x.is_categorical && single && all_numeric && x.unique_count <= pie_max_categories {
        ChartType::Pie
    } else if x.is_categorical && all_numeric {
        if single {
            ChartType::Bar
        } else {
            ChartType::GroupedBar
        }
    } else if x.is_numeric && all_numeric {
        ChartType::Scatter
    } else {
        ChartType::Bar
    };
    Ok(suggestion)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationSuggestion {
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub x_axis: String,
    pub y_axis: Vec<String>,
    pub compatible_types: Vec<ChartType>,
    /// `"<chart type>: <reason>"` for related charts the axes do not fit.
    pub incompatible_types: Vec<String>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationSuggestions {
    pub charts: Vec<VisualizationSuggestion>,
    pub summary: String,
}

/// Starter charts from column roles alone: a scatter of the first two numeric
/// columns, and a bar of the first categorical column against the first
/// numeric column other than itself. Related chart types are split by
/// whether the same axes validate for them.
pub fn suggest_visualizations(
    profile: &SchemaProfile,
    engine: &ChartCompatibilityEngine,
) -> VisualizationSuggestions {
    let numeric: Vec<&ColumnProfile> = profile.column_profiles.iter().filter(|c| c.is_numeric).collect();
    let categorical: Vec<&ColumnProfile> = profile
        .column_profiles
        .iter()
        .filter(|c| c.is_categorical)
        .collect();

    let mut charts = Vec::new();
    if let [first, second, ..] = numeric.as_slice() {
        charts.push(suggestion(
            profile,
            engine,
            ChartType::Scatter,
            format!("{} vs {}", first.name, second.name),
            "Relationship between two numeric variables",
            &first.name,
            &second.name,
            "Scatter plots show relationships between continuous variables",
        ));
    }
    if let Some(category) = categorical.first() {
        if let Some(measure) = numeric.iter().find(|c| c.name != category.name) {
            charts.push(suggestion(
                profile,
                engine,
                ChartType::Bar,
                format!("{} Distribution", category.name),
                "Distribution across categories",
                &category.name,
                &measure.name,
                "Bar charts effectively show categorical comparisons",
            ));
        }
    }
    VisualizationSuggestions {
        charts,
        summary: "Basic visualization suggestions based on data types".to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn suggestion(
    profile: &SchemaProfile,
    engine: &ChartCompatibilityEngine,
    chart_type: ChartType,
    title: String,
    description: &str,
    x_axis: &str,
    y_axis: &str,
    reasoning: &str,
) -> VisualizationSuggestion {
    let y_axes = [y_axis];
    let mut compatible_types = Vec::new();
    let mut incompatible_types = Vec::new();
    for related in engine.compatible_alternatives(chart_type) {
        let verdict = engine.validate(related, x_axis, &y_axes, &profile.column_profiles);
        if verdict.is_compatible {
            compatible_types.push(related);
        } else {
            incompatible_types.push(format!("{related}: {}", verdict.reason));
        }
    }
    VisualizationSuggestion {
        chart_type,
        title,
        description: description.to_string(),
        x_axis: x_axis.to_string(),
        y_axis: vec![y_axis.to_string()],
        compatible_types,
        incompatible_types,
        reasoning: reasoning.to_string(),
    }
}
