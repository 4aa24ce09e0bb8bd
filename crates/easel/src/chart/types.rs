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

use crate::error::ChartError;
use crate::schema::ColumnProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Line,
    Bar,
    HorizontalBar,
    StackedBar,
    GroupedBar,
    Area,
    Scatter,
    Bubble,
    Pie,
    Donut,
    Box,
    Violin,
    Heatmap,
}

impl ChartType {
    pub const ALL: [ChartType; 13] = [
        ChartType::Line,
        ChartType::Bar,
        ChartType::HorizontalBar,
        ChartType::StackedBar,
        ChartType::GroupedBar,
        ChartType::Area,
        ChartType::Scatter,
        ChartType::Bubble,
        ChartType::Pie,
        ChartType::Donut,
        ChartType::Box,
        ChartType::Violin,
        ChartType::Heatmap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::HorizontalBar => "horizontal_bar",
            ChartType::StackedBar => "stacked_bar",
            ChartType::GroupedBar => "grouped_bar",
            ChartType::Area => "area",
            ChartType::Scatter => "scatter",
            ChartType::Bubble => "bubble",
            ChartType::Pie => "pie",
            ChartType::Donut => "donut",
            ChartType::Box => "box",
            ChartType::Violin => "violin",
            ChartType::Heatmap => "heatmap",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ChartType::Line => "Line Chart",
            ChartType::Bar => "Bar Chart",
            ChartType::HorizontalBar => "Horizontal Bar",
            ChartType::StackedBar => "Stacked Bar",
            ChartType::GroupedBar => "Grouped Bar",
            ChartType::Area => "Area Chart",
            ChartType::Scatter => "Scatter Plot",
            ChartType::Bubble => "Bubble Chart",
            ChartType::Pie => "Pie Chart",
            ChartType::Donut => "Donut Chart",
            ChartType::Box => "Box Plot",
            ChartType::Violin => "Violin Plot",
            ChartType::Heatmap => "Heatmap",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            ChartType::Line => "Best for time series and trends",
            ChartType::Bar => "Compare values across categories",
            ChartType::HorizontalBar => "Bar chart with horizontal orientation",
            ChartType::StackedBar => "Compare parts of a whole",
            ChartType::GroupedBar => "Compare multiple series",
            ChartType::Area => "Show cumulative totals over time",
            ChartType::Scatter => "Show relationships between variables",
            ChartType::Bubble => "Scatter plot with size dimension",
            ChartType::Pie => "Show proportions of a whole",
            ChartType::Donut => "Pie chart with hollow center",
            ChartType::Box => "Show distribution and outliers",
            ChartType::Violin => "Show distribution density",
            ChartType::Heatmap => "Show patterns in matrix data",
        }
    }

    pub fn requirement(&self) -> Option<&'static ChartRequirement> {
        REQUIREMENTS
            .iter()
            .find(|(chart_type, _)| chart_type == self)
            .map(|(_, requirement)| requirement)
    }

    /// Directed row of the compatibility graph; not symmetric.
    pub fn related(&self) -> &'static [ChartType] {
        use ChartType::*;
        match self {
            Line => &[Area, Scatter, Bar],
            Area => &[Line, Scatter],
            Bar => &[HorizontalBar, StackedBar, GroupedBar, Line],
            HorizontalBar => &[Bar, StackedBar],
            StackedBar => &[Bar, GroupedBar, HorizontalBar],
            GroupedBar => &[Bar, StackedBar],
            Scatter => &[Line, Bubble, Area],
            Bubble => &[Scatter],
            Pie => &[Donut, Bar],
            Donut => &[Pie, Bar],
            Box => &[Violin],
            Violin => &[Box],
            Heatmap => &[],
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        ChartType::ALL
            .into_iter()
            .find(|chart_type| chart_type.as_str() == wanted)
            .ok_or_else(|| ChartError::UnknownChartType(s.to_string()))
    }
}

/// Catalogue entry listing a chart family for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartTypeInfo {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub name: &'static str,
    pub description: &'static str,
}

pub fn chart_type_catalog() -> Vec<ChartTypeInfo> {
    ChartType::ALL
        .into_iter()
        .map(|chart_type| ChartTypeInfo {
            chart_type,
            name: chart_type.display_name(),
            description: chart_type.summary(),
        })
        .collect()
}

/// Role a column can play on an axis, derived from its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Numeric,
    Categorical,
    Temporal,
    /// Listed by ordered charts but never satisfied by a profile.
    Sequential,
    /// Anything that is not numeric.
    String,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Categorical => "categorical",
            SemanticType::Temporal => "temporal",
            SemanticType::Sequential => "sequential",
            SemanticType::String => "string",
        }
    }

    pub fn is_satisfied_by(&self, profile: &ColumnProfile) -> bool {
        match self {
            SemanticType::Numeric => profile.is_numeric,
            SemanticType::Categorical => profile.is_categorical,
            SemanticType::Temporal => profile.is_temporal,
            SemanticType::Sequential => false,
            SemanticType::String => !profile.is_numeric,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRequirement {
    pub min_dimensions: usize,
    pub max_dimensions: usize,
    pub x_types: &'static [SemanticType],
    pub y_types: &'static [SemanticType],
    /// Recorded for matrix charts; not checked during validation.
    pub value_types: &'static [SemanticType],
    pub requires_ordered_x: bool,
}

pub fn describe_types(types: &[SemanticType]) -> String {
    let names: Vec<&str> = types.iter().map(SemanticType::as_str).collect();
    format!("[{}]", names.join(", "))
}

const NUMERIC: &[SemanticType] = &[SemanticType::Numeric];
const CATEGORICAL: &[SemanticType] = &[SemanticType::Categorical];
const CATEGORICAL_OR_STRING: &[SemanticType] = &[SemanticType::Categorical, SemanticType::String];
const ORDERED: &[SemanticType] = &[
    SemanticType::Temporal,
    SemanticType::Sequential,
    SemanticType::Numeric,
];

const fn requirement(
    min_dimensions: usize,
    max_dimensions: usize,
    x_types: &'static [SemanticType],
    y_types: &'static [SemanticType],
    requires_ordered_x: bool,
) -> ChartRequirement {
    ChartRequirement {
        min_dimensions,
        max_dimensions,
        x_types,
        y_types,
        value_types: &[],
        requires_ordered_x,
    }
}

static REQUIREMENTS: [(ChartType, ChartRequirement); 13] = [
    (ChartType::Line, requirement(2, 3, ORDERED, NUMERIC, true)),
    (ChartType::Area, requirement(2, 3, ORDERED, NUMERIC, true)),
    (ChartType::Bar, requirement(2, 3, CATEGORICAL_OR_STRING, NUMERIC, false)),
    (ChartType::HorizontalBar, requirement(2, 3, NUMERIC, CATEGORICAL_OR_STRING, false)),
    (ChartType::StackedBar, requirement(3, 3, CATEGORICAL, NUMERIC, false)),
    (ChartType::GroupedBar, requirement(3, 3, CATEGORICAL, NUMERIC, false)),
    (ChartType::Scatter, requirement(2, 4, NUMERIC, NUMERIC, false)),
    (ChartType::Bubble, requirement(3, 4, NUMERIC, NUMERIC, false)),
    (ChartType::Pie, requirement(2, 2, CATEGORICAL, NUMERIC, false)),
    (ChartType::Donut, requirement(2, 2, CATEGORICAL, NUMERIC, false)),
    (ChartType::Box, requirement(2, 2, CATEGORICAL, NUMERIC, false)),
    (ChartType::Violin, requirement(2, 2, CATEGORICAL, NUMERIC, false)),
    (
        ChartType::Heatmap,
        ChartRequirement {
            min_dimensions: 3,
            max_dimensions: 3,
            x_types: CATEGORICAL,
            y_types: CATEGORICAL,
            value_types: NUMERIC,
            requires_ordered_x: false,
        },
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_leniently() {
        assert_eq!("horizontal_bar".parse::<ChartType>().unwrap(), ChartType::HorizontalBar);
        assert_eq!("Grouped-Bar".parse::<ChartType>().unwrap(), ChartType::GroupedBar);
        assert!(matches!(
            "sunburst".parse::<ChartType>(),
            Err(ChartError::UnknownChartType(_))
        ));
    }

    #[test]
    fn every_chart_type_has_a_requirement() {
        for chart_type in ChartType::ALL {
            let requirement = chart_type.requirement().unwrap();
            assert!(requirement.min_dimensions <= requirement.max_dimensions);
        }
        assert!(ChartType::Line.related().contains(&ChartType::Bar));
        assert!(!ChartType::Bar.related().contains(&ChartType::Line));
    }

    #[test]
    fn catalog_lists_every_family_once() {
        let catalog = chart_type_catalog();
        assert_eq!(catalog.len(), ChartType::ALL.len());
        assert_eq!(catalog[0].name, "Line Chart");
        let heatmap = serde_json::to_value(&catalog[12]).unwrap();
        assert_eq!(heatmap["type"], "heatmap");
        assert_eq!(heatmap["description"], "Show patterns in matrix data");
    }
}
