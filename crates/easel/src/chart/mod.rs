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

//! Chart families, their column requirements, and data shaping per family.

pub mod compatibility;
pub mod prepare;
pub mod suggest;
pub mod types;

pub use compatibility::{ChartCompatibilityEngine, CompatibilityResult, DEFAULT_MAX_ALTERNATIVES};
pub use prepare::{ChartDataPreparer, ChartFilters, ChartRequest};
pub use suggest::{
    suggest_optimal_chart, suggest_optimal_chart_with, suggest_visualizations,
    VisualizationSuggestion, VisualizationSuggestions, DEFAULT_PIE_MAX_CATEGORIES,
};
pub use types::{
    chart_type_catalog, describe_types, ChartRequirement, ChartType, ChartTypeInfo, SemanticType,
};
