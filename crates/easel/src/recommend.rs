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

//! Producers of processing recommendations for a use case.

use crate::error::Result;
use crate::recommendation::ProcessingRecommendation;
use crate::schema::{ColumnProfile, SchemaProfile};
use tracing::debug;

const MAX_SELECTED: usize = 8;
const MIN_SELECTED: usize = 5;
const SPARSE_NULL_PERCENTAGE: f64 = 70.0;

/// A generator may be backed by an external model, so it can fail or be
/// unavailable; callers decide how to fall back.
pub trait RecommendationGenerator: Send + Sync {
    fn recommend(&self, use_case: &str, profile: &SchemaProfile)
        -> Result<ProcessingRecommendation>;
}

/// Returns the same document for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticRecommender {
    recommendation: ProcessingRecommendation,
}

impl StaticRecommender {
    pub fn new(recommendation: ProcessingRecommendation) -> Self {
        Self { recommendation }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        ProcessingRecommendation::from_json(text).map(Self::new)
    }
}

impl RecommendationGenerator for StaticRecommender {
    fn recommend(
        &self,
        _use_case: &str,
        _profile: &SchemaProfile,
    ) -> Result<ProcessingRecommendation> {
        Ok(self.recommendation.clone())
    }
}

struct KeywordGroup {
    goal_terms: &'static [&'static str],
    column_terms: &'static [&'static str],
    weight: i32,
    matches_categorical: bool,
    matches_temporal: bool,
}

const KEYWORD_GROUPS: &[KeywordGroup] = &[
    KeywordGroup {
        goal_terms: &["trend", "time", "monthly", "daily", "year", "season"],
        column_terms: &["date", "time", "month", "year"],
        weight: 3,
        matches_categorical: false,
        matches_temporal: true,
    },
    KeywordGroup {
        goal_terms: &["region", "location", "country", "city", "state"],
        column_terms: &["region", "country", "city", "state", "location"],
        weight: 3,
        matches_categorical: false,
        matches_temporal: false,
    },
    KeywordGroup {
        goal_terms: &["customer", "user", "segment", "cohort"],
        column_terms: &["customer", "user", "client", "segment"],
        weight: 3,
        matches_categorical: false,
        matches_temporal: false,
    },
    KeywordGroup {
        goal_terms: &["sale", "revenue", "price", "amount", "profit", "cost"],
        column_terms: &["sales", "revenue", "price", "amount", "profit", "cost"],
        weight: 3,
        matches_categorical: false,
        matches_temporal: false,
    },
    KeywordGroup {
        goal_terms: &["category", "type", "group", "status"],
        column_terms: &["category", "type", "group", "status"],
        weight: 2,
        matches_categorical: true,
        matches_temporal: false,
    },
    KeywordGroup {
        goal_terms: &["campaign", "channel", "spend", "conversion"],
        column_terms: &["campaign", "channel", "spend", "conversion", "ad"],
        weight: 3,
        matches_categorical: false,
        matches_temporal: false,
    },
];

/// Keeps the columns whose names and types fit the use-case wording and
/// drops the rest. Used when no external generator is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordRecommender;

impl KeywordRecommender {
    pub fn new() -> Self {
        Self
    }

    pub fn relevance(&self, column: &ColumnProfile, use_case: &str) -> i32 {
        let name = column.name.to_lowercase();
        let goal = use_case.to_lowercase();
        let mut score = 0;
        for group in KEYWORD_GROUPS {
            if !group.goal_terms.iter().any(|term| goal.contains(term)) {
                continue;
            }
            let by_type = (group.matches_temporal && column.is_temporal)
                || (group.matches_categorical && column.is_categorical);
            if by_type || group.column_terms.iter().any(|term| name.contains(term)) {
                score += group.weight;
            }
        }
        if column.is_numeric {
            score += 1;
        }
        if column.is_temporal {
            score += 1;
        }
        if column.null_percentage > SPARSE_NULL_PERCENTAGE {
            score -= 2;
        }
        score
    }

    /// Keeps the columns most relevant to `use_case` and drops the rest.
    /// Never fails, so it also serves as the fallback for other generators.
    pub fn select(&self, use_case: &str, profile: &SchemaProfile) -> ProcessingRecommendation {
        let mut scored: Vec<(&ColumnProfile, i32)> = profile
            .column_profiles
            .iter()
            .map(|column| (column, self.relevance(column, use_case)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let mut keep: Vec<String> = scored
            .iter()
            .filter(|(_, score)| *score > 1)
            .take(MAX_SELECTED)
            .map(|(column, _)| column.name.clone())
            .collect();
        if keep.is_empty() {
            keep = scored
                .iter()
                .take(MIN_SELECTED)
                .map(|(column, _)| column.name.clone())
                .collect();
        }
        let drop: Vec<String> = profile
            .column_profiles
            .iter()
            .filter(|column| !keep.contains(&column.name))
            .map(|column| column.name.clone())
            .collect();
        debug!("Keyword recommendation keeps {:?}", keep);

        ProcessingRecommendation {
            columns_to_drop: drop,
            columns_to_keep: keep,
            explanation: Some(
                "Selected columns relevant to the use case from their names and data types."
                    .to_string(),
            ),
            ..ProcessingRecommendation::default()
        }
    }
}

impl RecommendationGenerator for KeywordRecommender {
    fn recommend(
        &self,
        use_case: &str,
        profile: &SchemaProfile,
    ) -> Result<ProcessingRecommendation> {
        Ok(self.select(use_case, profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, DataFrame};
    use crate::schema::SchemaAnalyzer;

    #[test]
    fn keeps_columns_matching_the_use_case() {
        let df = DataFrame::from_columns(
            "t",
            vec![
                ("region", Column::from(vec![Some("north"), Some("south")])),
                ("revenue", Column::from(vec![Some(1.5), Some(2.5)])),
                ("notes", Column::from(vec![Some("x"), Some("y")])),
            ],
        )
        .unwrap();
        let profile = SchemaAnalyzer::new().profile(&df);
        let rec = KeywordRecommender::new().select("revenue by region", &profile);
        assert_eq!(rec.columns_to_keep, vec!["revenue", "region"]);
        assert_eq!(rec.columns_to_drop, vec!["notes"]);
        assert!(rec.cleaning_steps.is_empty());
    }

    #[test]
    fn falls_back_to_leading_columns() {
        let df = DataFrame::from_columns(
            "t",
            vec![("a", Column::from(vec![Some("x")])), ("b", Column::from(vec![Some("y")]))],
        )
        .unwrap();
        let profile = SchemaAnalyzer::new().profile(&df);
        let rec = KeywordRecommender::new().select("anything", &profile);
        assert_eq!(rec.columns_to_keep, vec!["a", "b"]);
        assert!(rec.columns_to_drop.is_empty());
    }
}
