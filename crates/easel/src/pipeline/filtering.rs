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

//! Row filter criteria.
//!
//! Grammar: `column op literal`, where `column` may be wrapped in `"`, `'`
//! or backticks (so it can contain operator characters), `op` is one of
//! `>`, `<`, `==`, `!=`, and `literal` is a number for `>`/`<` or free text
//! for the equality operators.

use crate::error::{PipelineError, PipelineResult};
use crate::frame::{ColumnData, DataFrame};
use std::fmt;
use std::str::FromStr;

const QUOTES: [char; 3] = ['"', '\'', '`'];
const OPERATOR_START: [char; 4] = ['>', '<', '=', '!'];

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    GreaterThan(f64),
    LessThan(f64),
    /// Trimmed, quote-stripped text.
    Equal(String),
    NotEqual(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriterion {
    pub column: String,
    pub comparison: Comparison,
    source: String,
}

fn invalid(text: &str, detail: &str) -> PipelineError {
    PipelineError::InvalidCriterion(format!("'{text}': {detail}"))
}

fn split_column(text: &str) -> PipelineResult<(String, &str)> {
    match text.chars().next() {
        Some(quote) if QUOTES.contains(&quote) => {
            let body = &text[quote.len_utf8()..];
            let end = body
                .find(quote)
                .ok_or_else(|| invalid(text, "unterminated quoted column"))?;
            Ok((body[..end].to_string(), &body[end + quote.len_utf8()..]))
        }
        Some(_) => {
            let end = text
                .find(OPERATOR_START)
                .ok_or_else(|| invalid(text, "missing operator"))?;
            Ok((text[..end].trim().to_string(), &text[end..]))
        }
        None => Err(invalid(text, "empty criterion")),
    }
}

impl FromStr for FilterCriterion {
    type Err = PipelineError;

    fn from_str(text: &str) -> PipelineResult<Self> {
        let trimmed = text.trim();
        let (column, rest) = split_column(trimmed)?;
        if column.is_empty() {
            return Err(invalid(trimmed, "missing column name"));
        }
        let rest = rest.trim_start();
        if rest.starts_with(">=") || rest.starts_with("<=") {
            return Err(invalid(trimmed, "only >, <, == and != are supported"));
        }
        let (operator, literal) = ["==", "!=", ">", "<"]
            .iter()
            .find_map(|op| rest.strip_prefix(op).map(|literal| (*op, literal.trim())))
            .ok_or_else(|| invalid(trimmed, "missing operator"))?;
        if literal.is_empty() {
            return Err(invalid(trimmed, "missing value"));
        }
        let number = || {
            literal
                .parse::<f64>()
                .map_err(|_| invalid(trimmed, &format!("'{literal}' is not a number")))
        };
        let text_value = || literal.trim_matches(|c| c == '"' || c == '\'').to_string();
        let comparison = match operator {
            ">" => Comparison::GreaterThan(number()?),
            "<" => Comparison::LessThan(number()?),
            "==" => Comparison::Equal(text_value()),
            _ => Comparison::NotEqual(text_value()),
        };
        Ok(Self {
            column,
            comparison,
            source: trimmed.to_string(),
        })
    }
}

impl fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FilterCriterion {
    /// Keeps matching rows. Ordering comparisons need a numeric column and
    /// never match nulls; nulls never equal a literal, so `!=` keeps them.
    pub fn apply(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        let column = df
            .get_column(&self.column)
            .ok_or_else(|| PipelineError::ColumnNotFound(self.column.clone()))?;
        let numeric = column.data_type().is_numeric();
        let filtered = match &self.comparison {
            Comparison::GreaterThan(_) | Comparison::LessThan(_) if !numeric => {
                return Err(PipelineError::NotNumeric {
                    column: self.column.clone(),
                })
            }
            Comparison::GreaterThan(bound) => {
                df.filter(|i| column.to_f64(i).is_some_and(|v| v > *bound))?
            }
            Comparison::LessThan(bound) => {
                df.filter(|i| column.to_f64(i).is_some_and(|v| v < *bound))?
            }
            Comparison::Equal(expected) | Comparison::NotEqual(expected) => {
                let keep_equal = matches!(self.comparison, Comparison::Equal(_));
                let as_number = numeric.then(|| expected.parse::<f64>().ok()).flatten();
                df.filter(|i| {
                    let equal = match as_number {
                        Some(n) => column.to_f64(i).is_some_and(|v| v == n),
                        None => column.get_string(i).is_some_and(|s| s.trim() == expected.as_str()),
                    };
                    equal == keep_equal
                })?
            }
        };
        Ok(filtered)
    }
}
