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

use crate::frame::common::{parse_temporal, DataType, FrameError, Result, Scalar};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const BOOLEAN_TRUE: &[&str] = &["true", "t", "yes"];
const BOOLEAN_FALSE: &[&str] = &["false", "f", "no"];

pub trait ColumnData: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn data_type(&self) -> DataType;
    fn null_count(&self) -> usize;
    fn get_scalar(&self, index: usize) -> Scalar;
    fn to_f64(&self, index: usize) -> Option<f64>;

    fn get_string(&self, index: usize) -> Option<String> {
        self.get_scalar(index).render()
    }
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable column storage. Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub enum Column {
    Int64(Arc<[Option<i64>]>),
    Float64(Arc<[Option<f64>]>),
    String(Arc<[Option<Arc<str>>]>),
    Boolean(Arc<[Option<bool>]>),
    Datetime(Arc<[Option<NaiveDateTime>]>),
}

fn count_nulls<T: Sync>(data: &[Option<T>]) -> usize {
    data.par_iter().filter(|v| v.is_none()).count()
}

fn gather<T: Clone + Send + Sync>(data: &[Option<T>], indices: &[usize]) -> Result<Vec<Option<T>>> {
    indices
        .par_iter()
        .map(|&i| data.get(i).cloned().ok_or(FrameError::OutOfBounds(i)))
        .collect()
}

fn fill<T: Clone>(data: &[Option<T>], value: T) -> Arc<[Option<T>]> {
    data.iter()
        .map(|v| Some(v.clone().unwrap_or_else(|| value.clone())))
        .collect()
}

fn forward_fill<T: Clone>(data: &[Option<T>]) -> Arc<[Option<T>]> {
    let mut last: Option<T> = None;
    data.iter()
        .map(|v| {
            if v.is_some() {
                last = v.clone();
            }
            last.clone()
        })
        .collect()
}

fn float_key(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

impl ColumnData for Column {
    fn len(&self) -> usize {
        match self {
            Column::Int64(data) => data.len(),
            Column::Float64(data) => data.len(),
            Column::String(data) => data.len(),
            Column::Boolean(data) => data.len(),
            Column::Datetime(data) => data.len(),
        }
    }
    fn data_type(&self) -> DataType {
        match self {
            Column::Int64(_) => DataType::Int64,
            Column::Float64(_) => DataType::Float64,
            Column::String(_) => DataType::String,
            Column::Boolean(_) => DataType::Boolean,
            Column::Datetime(_) => DataType::Datetime,
        }
    }
    fn null_count(&self) -> usize {
        match self {
            Column::Int64(data) => count_nulls(data),
            Column::Float64(data) => count_nulls(data),
            Column::String(data) => count_nulls(data),
            Column::Boolean(data) => count_nulls(data),
            Column::Datetime(data) => count_nulls(data),
        }
    }
    fn get_scalar(&self, index: usize) -> Scalar {
        let value = match self {
            Column::Int64(data) => data.get(index).copied().flatten().map(Scalar::Int),
            Column::Float64(data) => data.get(index).copied().flatten().map(Scalar::Float),
            Column::String(data) => data
                .get(index)
                .and_then(|v| v.as_ref())
                .map(|s| Scalar::Text(s.to_string())),
            Column::Boolean(data) => data.get(index).copied().flatten().map(Scalar::Bool),
            Column::Datetime(data) => data.get(index).copied().flatten().map(Scalar::Datetime),
        };
        value.unwrap_or(Scalar::Null)
    }
    fn to_f64(&self, index: usize) -> Option<f64> {
        match self {
            Column::Int64(data) => data.get(index).copied().flatten().map(|v| v as f64),
            Column::Float64(data) => data.get(index).copied().flatten(),
            _ => None,
        }
    }
}

impl Column {
    pub fn is_null(&self, index: usize) -> bool {
        match self {
            Column::Int64(data) => !matches!(data.get(index), Some(Some(_))),
            Column::Float64(data) => !matches!(data.get(index), Some(Some(_))),
            Column::String(data) => !matches!(data.get(index), Some(Some(_))),
            Column::Boolean(data) => !matches!(data.get(index), Some(Some(_))),
            Column::Datetime(data) => !matches!(data.get(index), Some(Some(_))),
        }
    }

    /// A column of `len` nulls of the given type.
    pub fn nulls(data_type: DataType, len: usize) -> Column {
        match data_type {
            DataType::Int64 => Column::Int64(vec![None; len].into()),
            DataType::Float64 => Column::Float64(vec![None; len].into()),
            DataType::String => Column::String(vec![None; len].into()),
            DataType::Boolean => Column::Boolean(vec![None; len].into()),
            DataType::Datetime => Column::Datetime(vec![None; len].into()),
        }
    }

    pub fn scalars(&self) -> impl Iterator<Item = Scalar> + '_ {
        (0..self.len()).map(move |i| self.get_scalar(i))
    }

    /// Non-null values of a numeric column, in row order. Empty for other types.
    pub fn numeric_values(&self) -> Vec<f64> {
        match self {
            Column::Int64(data) => data.iter().flatten().map(|v| *v as f64).collect(),
            Column::Float64(data) => data.iter().flatten().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Number of distinct non-null values.
    pub fn unique_count(&self) -> usize {
        match self {
            Column::Int64(data) => data.iter().flatten().collect::<HashSet<_>>().len(),
            Column::Float64(data) => data
                .iter()
                .flatten()
                .map(|v| float_key(*v))
                .collect::<HashSet<_>>()
                .len(),
            Column::String(data) => data.iter().flatten().collect::<HashSet<_>>().len(),
            Column::Boolean(data) => data.iter().flatten().collect::<HashSet<_>>().len(),
            Column::Datetime(data) => data.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Most frequent non-null value; ties resolve to the smallest value.
    pub fn mode(&self) -> Option<Scalar> {
        let mut counts: HashMap<String, (usize, Scalar)> = HashMap::new();
        for value in self.scalars().filter(|v| !v.is_null()) {
            let key = value.render().unwrap_or_default();
            counts.entry(key).or_insert((0, value)).0 += 1;
        }
        counts
            .into_values()
            .max_by(|(ca, a), (cb, b)| ca.cmp(cb).then_with(|| b.total_cmp(a)))
            .map(|(_, value)| value)
    }

    pub fn select_rows(&self, indices: &[usize]) -> Result<Column> {
        Ok(match self {
            Column::Int64(data) => Column::Int64(gather(data, indices)?.into()),
            Column::Float64(data) => Column::Float64(gather(data, indices)?.into()),
            Column::String(data) => Column::String(gather(data, indices)?.into()),
            Column::Boolean(data) => Column::Boolean(gather(data, indices)?.into()),
            Column::Datetime(data) => Column::Datetime(gather(data, indices)?.into()),
        })
    }

    /// Replaces nulls with `value`, coerced to the column type. An integer
    /// column filled with a fractional number is widened to float first.
    pub fn fill_nulls(&self, value: &Scalar) -> Result<Column> {
        if let (Column::Int64(_), Scalar::Float(f)) = (self, value) {
            if f.fract() != 0.0 {
                return self.to_numeric_float().fill_nulls(value);
            }
        }
        Ok(match self {
            Column::Int64(data) => Column::Int64(fill(data, coerce_i64(value)?)),
            Column::Float64(data) => Column::Float64(fill(data, coerce_f64(value)?)),
            Column::String(data) => {
                let text = value.render().ok_or_else(|| null_fill_error(DataType::String))?;
                Column::String(fill(data, Arc::from(text.as_str())))
            }
            Column::Boolean(data) => Column::Boolean(fill(data, coerce_bool(value)?)),
            Column::Datetime(data) => Column::Datetime(fill(data, coerce_datetime(value)?)),
        })
    }

    pub fn forward_fill(&self) -> Column {
        match self {
            Column::Int64(data) => Column::Int64(forward_fill(data)),
            Column::Float64(data) => Column::Float64(forward_fill(data)),
            Column::String(data) => Column::String(forward_fill(data)),
            Column::Boolean(data) => Column::Boolean(forward_fill(data)),
            Column::Datetime(data) => Column::Datetime(forward_fill(data)),
        }
    }

    fn to_numeric_float(&self) -> Column {
        Column::from((0..self.len()).map(|i| self.to_f64(i)).collect::<Vec<_>>())
    }

    /// Coerces to a numeric column. Values that do not parse become null.
    pub fn to_numeric(&self) -> Column {
        match self {
            Column::Int64(_) | Column::Float64(_) => self.clone(),
            Column::Boolean(data) => Column::Int64(data.iter().map(|v| v.map(i64::from)).collect()),
            Column::Datetime(data) => Column::Int64(
                data.iter()
                    .map(|v| v.and_then(|dt| dt.and_utc().timestamp_nanos_opt()))
                    .collect(),
            ),
            Column::String(data) => {
                let trimmed: Vec<Option<&str>> =
                    data.iter().map(|v| v.as_deref().map(str::trim)).collect();
                let all_integral = trimmed
                    .iter()
                    .flatten()
                    .filter(|s| s.parse::<f64>().is_ok())
                    .all(|s| s.parse::<i64>().is_ok());
                if all_integral {
                    Column::Int64(trimmed.iter().map(|v| v.and_then(|s| s.parse().ok())).collect())
                } else {
                    Column::from(
                        trimmed
                            .iter()
                            .map(|v| v.and_then(|s| s.parse::<f64>().ok()))
                            .collect::<Vec<_>>(),
                    )
                }
            }
        }
    }

    /// Coerces to a datetime column. Values that do not parse become null.
    pub fn to_datetime<S: AsRef<str>>(&self, formats: &[S]) -> Column {
        match self {
            Column::Datetime(_) => self.clone(),
            _ => Column::Datetime(
                self.scalars()
                    .map(|v| v.render().and_then(|s| parse_temporal(&s, formats)))
                    .collect(),
            ),
        }
    }

    pub fn to_text(&self) -> Column {
        match self {
            Column::String(_) => self.clone(),
            _ => Column::String(
                self.scalars()
                    .map(|v| v.render().map(|s| Arc::from(s.as_str())))
                    .collect(),
            ),
        }
    }

    /// Approximate heap footprint in bytes.
    pub fn memory_estimate(&self) -> usize {
        let fixed = self.len() * self.data_type().cell_width();
        match self {
            Column::String(data) => fixed + data.iter().flatten().map(|s| s.len()).sum::<usize>(),
            _ => fixed,
        }
    }
}

fn null_fill_error(data_type: DataType) -> FrameError {
    FrameError::InvalidOperation(format!("cannot fill a {data_type} column with null"))
}

fn mismatch(value: &Scalar, data_type: DataType) -> FrameError {
    FrameError::TypeMismatch(format!("cannot store '{value}' in a {data_type} column"))
}

fn coerce_i64(value: &Scalar) -> Result<i64> {
    match value {
        Scalar::Int(v) => Ok(*v),
        Scalar::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
        Scalar::Text(s) => s.trim().parse().map_err(|_| mismatch(value, DataType::Int64)),
        Scalar::Null => Err(null_fill_error(DataType::Int64)),
        _ => Err(mismatch(value, DataType::Int64)),
    }
}

fn coerce_f64(value: &Scalar) -> Result<f64> {
    match value {
        Scalar::Int(_) | Scalar::Float(_) => value.as_f64().ok_or_else(|| mismatch(value, DataType::Float64)),
        Scalar::Text(s) => s.trim().parse().map_err(|_| mismatch(value, DataType::Float64)),
        Scalar::Null => Err(null_fill_error(DataType::Float64)),
        _ => Err(mismatch(value, DataType::Float64)),
    }
}

fn coerce_bool(value: &Scalar) -> Result<bool> {
    match value {
        Scalar::Bool(b) => Ok(*b),
        Scalar::Text(s) => parse_bool(s).ok_or_else(|| mismatch(value, DataType::Boolean)),
        Scalar::Null => Err(null_fill_error(DataType::Boolean)),
        _ => Err(mismatch(value, DataType::Boolean)),
    }
}

fn coerce_datetime(value: &Scalar) -> Result<NaiveDateTime> {
    match value {
        Scalar::Datetime(dt) => Ok(*dt),
        Scalar::Text(s) => parse_temporal(s, crate::frame::common::DEFAULT_TEMPORAL_FORMATS)
            .ok_or_else(|| mismatch(value, DataType::Datetime)),
        Scalar::Null => Err(null_fill_error(DataType::Datetime)),
        _ => Err(mismatch(value, DataType::Datetime)),
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    let lower = value.trim().to_lowercase();
    if BOOLEAN_TRUE.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

impl From<Vec<Option<i64>>> for Column {
    fn from(values: Vec<Option<i64>>) -> Self {
        Column::Int64(values.into())
    }
}

impl From<Vec<Option<f64>>> for Column {
    fn from(values: Vec<Option<f64>>) -> Self {
        Column::Float64(
            values
                .into_iter()
                .map(|v| v.filter(|f| f.is_finite()))
                .collect(),
        )
    }
}

impl From<Vec<Option<bool>>> for Column {
    fn from(values: Vec<Option<bool>>) -> Self {
        Column::Boolean(values.into())
    }
}

impl From<Vec<Option<NaiveDateTime>>> for Column {
    fn from(values: Vec<Option<NaiveDateTime>>) -> Self {
        Column::Datetime(values.into())
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Self {
        Column::String(values.into_iter().map(|v| v.map(Arc::from)).collect())
    }
}

impl From<Vec<Option<&str>>> for Column {
    fn from(values: Vec<Option<&str>>) -> Self {
        Column::String(values.into_iter().map(|v| v.map(Arc::from)).collect())
    }
}

/// Accumulates raw text cells and settles on the narrowest type that holds
/// every non-null value: int, float, bool, datetime, then string.
#[derive(Debug)]
pub struct ColumnBuilder {
    values: Vec<Option<String>>,
    temporal_formats: Vec<String>,
}

impl ColumnBuilder {
    pub fn new() -> Self {
        Self::with_temporal_formats(
            crate::frame::common::DEFAULT_TEMPORAL_FORMATS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    pub fn with_temporal_formats(temporal_formats: Vec<String>) -> Self {
        Self {
            values: Vec::new(),
            temporal_formats,
        }
    }

    pub fn push(&mut self, value: Option<String>) {
        self.values.push(value.filter(|s| !s.trim().is_empty()));
    }

    pub fn infer_type(&self) -> DataType {
        let present: Vec<&str> = self.values.iter().flatten().map(|s| s.trim()).collect();
        if present.is_empty() {
            return DataType::String;
        }
        if present.iter().all(|s| s.parse::<i64>().is_ok()) {
            DataType::Int64
        } else if present.iter().all(|s| s.parse::<f64>().is_ok()) {
            DataType::Float64
        } else if present.iter().all(|s| parse_bool(s).is_some()) {
            DataType::Boolean
        } else if present
            .iter()
            .all(|s| parse_temporal(s, &self.temporal_formats).is_some())
        {
            DataType::Datetime
        } else {
            DataType::String
        }
    }

    pub fn build(self) -> Column {
        let data_type = self.infer_type();
        let values = self.values;
        match data_type {
            DataType::Int64 => Column::Int64(
                values.iter().map(|v| v.as_deref().and_then(|s| s.trim().parse().ok())).collect(),
            ),
            DataType::Float64 => Column::from(
                values
                    .iter()
                    .map(|v| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok()))
                    .collect::<Vec<_>>(),
            ),
            DataType::Boolean => Column::Boolean(
                values.iter().map(|v| v.as_deref().and_then(parse_bool)).collect(),
            ),
            DataType::Datetime => Column::Datetime(
                values
                    .iter()
                    .map(|v| v.as_deref().and_then(|s| parse_temporal(s, &self.temporal_formats)))
                    .collect(),
            ),
            DataType::String => Column::from(values),
        }
    }
}

impl Default for ColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_infers_narrowest_type() {
        let mut ints = ColumnBuilder::new();
        for v in ["1", "2", ""] {
            ints.push(Some(v.to_string()));
        }
        let column = ints.build();
        assert_eq!(column.data_type(), DataType::Int64);
        assert_eq!(column.null_count(), 1);

        let mut dates = ColumnBuilder::new();
        dates.push(Some("2024-01-01".to_string()));
        dates.push(Some("2024-02-01".to_string()));
        assert_eq!(dates.infer_type(), DataType::Datetime);

        let mut mixed = ColumnBuilder::new();
        mixed.push(Some("1".to_string()));
        mixed.push(Some("x".to_string()));
        assert_eq!(mixed.infer_type(), DataType::String);
    }

    #[test]
    fn mode_prefers_smallest_on_ties() {
        let column = Column::from(vec![Some(3i64), Some(1), Some(3), Some(1), None]);
        assert_eq!(column.mode(), Some(Scalar::Int(1)));
        assert_eq!(Column::nulls(DataType::Int64, 3).mode(), None);
    }

    #[test]
    fn forward_fill_leaves_leading_nulls() {
        let column = Column::from(vec![None, Some("a"), None, Some("b"), None]).forward_fill();
        let values: Vec<Option<String>> = (0..column.len()).map(|i| column.get_string(i)).collect();
        assert_eq!(
            values,
            vec![None, Some("a".into()), Some("a".into()), Some("b".into()), Some("b".into())]
        );
    }

    #[test]
    fn numeric_conversion_nulls_failures() {
        let column = Column::from(vec![Some("1"), Some("x"), Some("3")]).to_numeric();
        assert_eq!(column.data_type(), DataType::Int64);
        assert_eq!(column.null_count(), 1);

        let floats = Column::from(vec![Some("1.5"), Some("2")]).to_numeric();
        assert_eq!(floats.data_type(), DataType::Float64);
    }

    #[test]
    fn integer_fill_with_fraction_widens() {
        let column = Column::from(vec![Some(1i64), None]).fill_nulls(&Scalar::Float(1.5)).unwrap();
        assert_eq!(column.data_type(), DataType::Float64);
        assert_eq!(column.to_f64(1), Some(1.5));
        assert!(Column::from(vec![Some(1i64), None])
            .fill_nulls(&Scalar::Text("Unknown".into()))
            .is_err());
    }
}
