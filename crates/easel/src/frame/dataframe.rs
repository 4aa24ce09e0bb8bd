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

use crate::frame::column::{Column, ColumnData};
use crate::frame::common::{DatasetMetadata, FrameError, Result};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One row rendered as a JSON object, keys in column order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct DataFrame {
    pub columns: HashMap<String, Arc<Column>>,
    pub metadata: DatasetMetadata,
    column_order: Vec<String>,
}

impl DataFrame {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            columns: HashMap::new(),
            metadata,
            column_order: Vec::new(),
        }
    }

    pub fn from_columns<I, S>(name: &str, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut df = DataFrame::new(DatasetMetadata::named(name));
        for (column_name, column) in columns {
            df.add_column(column_name.into(), column)?;
        }
        Ok(df)
    }

    /// Adds a column, or replaces an existing one in place. Every column
    /// must have the frame's row count.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        let has_other_columns = self.column_order.iter().any(|existing| *existing != name);
        if has_other_columns && column.len() != self.row_count() {
            return Err(FrameError::LengthMismatch {
                expected: self.row_count(),
                actual: column.len(),
            });
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.metadata.row_count = column.len();
        self.columns.insert(name, Arc::new(column));
        self.metadata.column_count = self.columns.len();
        Ok(())
    }

    /// Removes a column. Returns false when it was not present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        if self.columns.remove(name).is_none() {
            return false;
        }
        self.column_order.retain(|existing| existing != name);
        self.metadata.column_count = self.columns.len();
        true
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(|arc| arc.as_ref())
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_column(name)
            .ok_or_else(|| FrameError::ColumnNotFound(name.to_string()))
    }

    /// Projects the named columns, in the order given.
    pub fn select(&self, column_names: &[String]) -> Result<DataFrame> {
        let mut df = DataFrame::new(self.derived_metadata("selected"));
        df.metadata.row_count = self.row_count();
        for name in column_names {
            let column = self.column(name)?;
            df.add_column(name.clone(), column.clone())?;
        }
        Ok(df)
    }

    pub fn select_rows(&self, indices: &[usize]) -> Result<DataFrame> {
        let mut df = DataFrame::new(self.derived_metadata("filtered"));
        df.metadata.row_count = indices.len();
        for name in &self.column_order {
            let column = self.columns[name].select_rows(indices)?;
            df.add_column(name.clone(), column)?;
        }
        Ok(df)
    }

    /// Keeps rows for which `predicate` holds, preserving their order.
    pub fn filter<P>(&self, predicate: P) -> Result<DataFrame>
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count())
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices)
    }

    /// Stable sort on one column; nulls go last.
    pub fn sort_by(&self, column_name: &str, ascending: bool) -> Result<DataFrame> {
        let column = self.column(column_name)?;
        let keys: Vec<_> = column.scalars().collect();
        let mut indices: Vec<usize> = (0..self.row_count()).collect();
        indices.par_sort_by(|&a, &b| {
            let ordering = keys[a].total_cmp(&keys[b]);
            if ascending || keys[a].is_null() || keys[b].is_null() {
                ordering
            } else {
                ordering.reverse()
            }
        });
        self.select_rows(&indices)
    }

    pub fn row_record(&self, index: usize) -> Result<Record> {
        if index >= self.row_count() {
            return Err(FrameError::OutOfBounds(index));
        }
        Ok(self
            .column_order
            .iter()
            .map(|name| (name.clone(), self.columns[name].get_scalar(index).to_json()))
            .collect())
    }

    pub fn to_records(&self) -> Vec<Record> {
        (0..self.row_count())
            .into_par_iter()
            .filter_map(|i| self.row_record(i).ok())
            .collect()
    }

    /// First `limit` rows as records.
    pub fn preview(&self, limit: usize) -> Vec<Record> {
        (0..self.row_count().min(limit))
            .filter_map(|i| self.row_record(i).ok())
            .collect()
    }

    pub fn memory_estimate_bytes(&self) -> usize {
        self.columns.values().map(|c| c.memory_estimate()).sum()
    }

    fn derived_metadata(&self, suffix: &str) -> DatasetMetadata {
        let mut metadata = DatasetMetadata::named(format!("{}_{suffix}", self.metadata.name));
        metadata.id = self.metadata.id.clone();
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> DataFrame {
        DataFrame::from_columns(
            "sample",
            vec![
                ("region", Column::from(vec![Some("b"), Some("a"), None, Some("a")])),
                ("amount", Column::from(vec![Some(2i64), Some(1), Some(3), None])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_mismatched_column_length() {
        let mut df = sample();
        let err = df
            .add_column("short".into(), Column::from(vec![Some(1i64)]))
            .unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 4, actual: 1 }));
    }

    #[test]
    fn replacing_a_column_keeps_its_position() {
        let mut df = sample();
        df.add_column("region".into(), Column::from(vec![Some("x"); 4]))
            .unwrap();
        assert_eq!(df.column_names(), &["region".to_string(), "amount".to_string()]);
    }

    #[test]
    fn sort_is_stable_and_puts_nulls_last() {
        let sorted = sample().sort_by("region", true).unwrap();
        let amounts: Vec<_> = sorted.to_records().into_iter().map(|r| r["amount"].clone()).collect();
        assert_eq!(amounts, vec![json!(1), json!(null), json!(2), json!(3)]);
    }

    #[test]
    fn dropping_every_column_keeps_row_count() {
        let mut df = sample();
        assert!(df.drop_column("region"));
        assert!(df.drop_column("amount"));
        assert!(!df.drop_column("amount"));
        assert_eq!(df.column_count(), 0);
        assert_eq!(df.row_count(), 4);
    }

    #[test]
    fn select_projects_in_requested_order() {
        let df = sample()
            .select(&["amount".to_string(), "region".to_string()])
            .unwrap();
        assert_eq!(df.column_names(), &["amount".to_string(), "region".to_string()]);
        assert_eq!(df.row_count(), 4);
        assert!(matches!(
            sample().select(&["ghost".to_string()]),
            Err(FrameError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn records_follow_column_order() {
        let record = sample().row_record(0).unwrap();
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, vec!["region", "amount"]);
        assert_eq!(record["region"], json!("b"));
    }
}
