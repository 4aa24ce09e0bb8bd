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

//! Session-scoped storage for datasets and saved chart configurations.

use crate::chart::{ChartFilters, ChartType};
use crate::error::{StoreError, StoreResult};
use crate::frame::{DataFrame, Record};
use crate::io::FileFormat;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: String,
    pub file_name: String,
    pub file_type: FileFormat,
    pub created_at: DateTime<Utc>,
    pub use_case: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
}

impl SessionMetadata {
    pub fn new(file_name: impl Into<String>, file_type: FileFormat, df: &DataFrame) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            file_type,
            created_at: Utc::now(),
            use_case: None,
            row_count: df.row_count(),
            column_count: df.column_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfiguration {
    pub id: String,
    pub session_id: String,
    pub chart_type: ChartType,
    pub title: String,
    pub x_axis: String,
    pub y_axis: Vec<String>,
    #[serde(default)]
    pub filters: Option<ChartFilters>,
    pub data: Vec<Record>,
    pub created_at: DateTime<Utc>,
}

/// Original and processed datasets per session. A session exists once its
/// original dataset has been stored.
pub trait DatasetStore: Send + Sync {
    fn put_original(&self, metadata: SessionMetadata, df: DataFrame) -> StoreResult<()>;
    fn original(&self, session_id: &str) -> StoreResult<Arc<DataFrame>>;
    /// Stores the processed dataset together with the log of the run that
    /// produced it.
    fn put_processed(
        &self,
        session_id: &str,
        df: DataFrame,
        processing_log: Vec<String>,
    ) -> StoreResult<()>;
    fn processed(&self, session_id: &str) -> StoreResult<Option<Arc<DataFrame>>>;
    /// Log of the last processing run; empty when the session is unprocessed.
    fn processing_log(&self, session_id: &str) -> StoreResult<Vec<String>>;
    /// Discards the processed dataset and its log, returning the session to
    /// its original.
    fn clear_processed(&self, session_id: &str) -> StoreResult<()>;
    fn metadata(&self, session_id: &str) -> StoreResult<SessionMetadata>;
    fn set_use_case(&self, session_id: &str, use_case: &str) -> StoreResult<()>;
    fn delete(&self, session_id: &str) -> StoreResult<bool>;

    /// The processed dataset when present, else the original.
    fn latest(&self, session_id: &str) -> StoreResult<Arc<DataFrame>> {
        match self.processed(session_id)? {
            Some(df) => Ok(df),
            None => self.original(session_id),
        }
    }
}

pub trait ChartStore: Send + Sync {
    fn save(&self, config: ChartConfiguration) -> StoreResult<String>;
    fn get(&self, chart_id: &str) -> StoreResult<ChartConfiguration>;
    fn list(&self, session_id: &str) -> StoreResult<Vec<ChartConfiguration>>;
    fn delete(&self, chart_id: &str) -> StoreResult<bool>;
    /// Removes every chart of a session, returning how many were removed.
    fn delete_for_session(&self, session_id: &str) -> StoreResult<usize>;
}

#[derive(Debug)]
struct SessionEntry {
    metadata: SessionMetadata,
    original: Arc<DataFrame>,
    processed: Option<Arc<DataFrame>>,
    processing_log: Vec<String>,
}

fn read_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned)
}

fn write_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned)
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryDatasetStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<R>(&self, session_id: &str, f: impl FnOnce(&SessionEntry) -> R) -> StoreResult<R> {
        read_lock(&self.sessions)?
            .get(session_id)
            .map(f)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    fn with_entry_mut<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionEntry) -> R,
    ) -> StoreResult<R> {
        write_lock(&self.sessions)?
            .get_mut(session_id)
            .map(f)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }
}

impl DatasetStore for InMemoryDatasetStore {
    fn put_original(&self, metadata: SessionMetadata, df: DataFrame) -> StoreResult<()> {
        let id = metadata.id.clone();
        write_lock(&self.sessions)?.insert(
            id.clone(),
            SessionEntry {
                metadata,
                original: Arc::new(df),
                processed: None,
                processing_log: Vec::new(),
            },
        );
        debug!("Stored original dataset for session {id}");
        Ok(())
    }

    fn original(&self, session_id: &str) -> StoreResult<Arc<DataFrame>> {
        self.with_entry(session_id, |entry| Arc::clone(&entry.original))
    }

    fn put_processed(
        &self,
        session_id: &str,
        df: DataFrame,
        processing_log: Vec<String>,
    ) -> StoreResult<()> {
        self.with_entry_mut(session_id, |entry| {
            entry.processed = Some(Arc::new(df));
            entry.processing_log = processing_log;
        })?;
        debug!("Stored processed dataset for session {session_id}");
        Ok(())
    }

    fn processed(&self, session_id: &str) -> StoreResult<Option<Arc<DataFrame>>> {
        self.with_entry(session_id, |entry| entry.processed.clone())
    }

    fn processing_log(&self, session_id: &str) -> StoreResult<Vec<String>> {
        self.with_entry(session_id, |entry| entry.processing_log.clone())
    }

    fn clear_processed(&self, session_id: &str) -> StoreResult<()> {
        self.with_entry_mut(session_id, |entry| {
            entry.processed = None;
            entry.processing_log.clear();
        })
    }

    fn metadata(&self, session_id: &str) -> StoreResult<SessionMetadata> {
        self.with_entry(session_id, |entry| entry.metadata.clone())
    }

    fn set_use_case(&self, session_id: &str, use_case: &str) -> StoreResult<()> {
        self.with_entry_mut(session_id, |entry| {
            entry.metadata.use_case = Some(use_case.to_string())
        })
    }

    fn delete(&self, session_id: &str) -> StoreResult<bool> {
        Ok(write_lock(&self.sessions)?.remove(session_id).is_some())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryChartStore {
    charts: Arc<RwLock<HashMap<String, ChartConfiguration>>>,
}

impl InMemoryChartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChartStore for InMemoryChartStore {
    fn save(&self, config: ChartConfiguration) -> StoreResult<String> {
        let id = config.id.clone();
        write_lock(&self.charts)?.insert(id.clone(), config);
        Ok(id)
    }

    fn get(&self, chart_id: &str) -> StoreResult<ChartConfiguration> {
        read_lock(&self.charts)?
            .get(chart_id)
            .cloned()
            .ok_or_else(|| StoreError::ChartNotFound(chart_id.to_string()))
    }

    fn list(&self, session_id: &str) -> StoreResult<Vec<ChartConfiguration>> {
        let mut charts: Vec<_> = read_lock(&self.charts)?
            .values()
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect();
        charts.sort_by_key(|c| c.created_at);
        Ok(charts)
    }

    fn delete(&self, chart_id: &str) -> StoreResult<bool> {
        Ok(write_lock(&self.charts)?.remove(chart_id).is_some())
    }

    fn delete_for_session(&self, session_id: &str) -> StoreResult<usize> {
        let mut charts = write_lock(&self.charts)?;
        let before = charts.len();
        charts.retain(|_, chart| chart.session_id != session_id);
        let removed = before - charts.len();
        debug!("Removed {removed} charts of session {session_id}");
        Ok(removed)
    }
}
