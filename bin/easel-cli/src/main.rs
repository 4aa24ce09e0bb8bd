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

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command};
use easel::chart::{suggest_optimal_chart_with, ChartFilters};
use easel::{
    CreateChartRequest, CustomOperation, DashboardService, EaselConfig, ProcessingRecommendation,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => EaselConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => EaselConfig::load_or_default(),
    };
    let service = DashboardService::new(config);

    let output = run(&service, args.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(service: &DashboardService, command: Command) -> Result<Value> {
    match command {
        Command::Profile { file } => {
            let session = open(service, &file)?;
            Ok(serde_json::to_value(service.schema(&session)?)?)
        }
        Command::Stats { file } => {
            let session = open(service, &file)?;
            Ok(serde_json::to_value(service.statistics(&session)?)?)
        }
        Command::Preview { file, rows } => {
            let session = open(service, &file)?;
            Ok(serde_json::to_value(service.preview(&session, Some(rows))?)?)
        }
        Command::Recommend { file, use_case } => {
            let session = open(service, &file)?;
            Ok(serde_json::to_value(service.recommend(&session, &use_case)?)?)
        }
        Command::Process {
            file,
            recommendation,
            output,
        } => {
            let session = open(service, &file)?;
            let text = std::fs::read_to_string(&recommendation)
                .with_context(|| format!("reading {}", recommendation.display()))?;
            let document = ProcessingRecommendation::from_json(&text)
                .with_context(|| format!("parsing {}", recommendation.display()))?;
            let summary = service.process(&session, &document)?;
            if let Some(path) = output {
                service.export_csv(&session, &path)?;
                info!("Wrote processed dataset to {}", path.display());
            }
            Ok(serde_json::to_value(summary)?)
        }
        Command::Custom {
            file,
            operations,
            output,
        } => {
            let session = open(service, &file)?;
            let text = std::fs::read_to_string(&operations)
                .with_context(|| format!("reading {}", operations.display()))?;
            let operations: Vec<CustomOperation> =
                serde_json::from_str(&text).context("parsing custom operations")?;
            let summary = service.custom_process(&session, &operations)?;
            if let Some(path) = output {
                service.export_csv(&session, &path)?;
                info!("Wrote processed dataset to {}", path.display());
            }
            Ok(serde_json::to_value(summary)?)
        }
        Command::Validate { file, axes } => {
            let session = open(service, &file)?;
            let compatibility =
                service.validate_chart(&session, axes.chart, &axes.x_axis, &axes.y_axes)?;
            let data = service.validate_chart_data(&session, &axes.x_axis, &axes.y_axes)?;
            Ok(json!({ "compatibility": compatibility, "data": data }))
        }
        Command::Chart {
            file,
            axes,
            title,
            filters,
        } => {
            let session_id = open(service, &file)?;
            let request = CreateChartRequest {
                session_id,
                chart_type: axes.chart,
                title,
                x_axis: axes.x_axis,
                y_axis: axes.y_axes,
                filters: parse_filters(&filters)?,
            };
            Ok(serde_json::to_value(service.create_chart(&request)?)?)
        }
        Command::Visualize { file } => {
            let session = open(service, &file)?;
            Ok(serde_json::to_value(service.suggest_visualizations(&session)?)?)
        }
        Command::ChartTypes => Ok(serde_json::to_value(service.chart_types())?),
        Command::Suggest {
            file,
            x_axis,
            y_axes,
        } => {
            let session = open(service, &file)?;
            let profile = service.schema(&session)?;
            let pie_max = service.config().charts.pie_max_categories;
            let chart = suggest_optimal_chart_with(&profile, &x_axis, &y_axes, pie_max)?;
            Ok(json!({ "chart_type": chart }))
        }
    }
}

fn open(service: &DashboardService, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("dataset path has no file name")?;
    Ok(service.upload(file_name, &bytes)?.session_id)
}

/// `column=value` pairs; repeating a column accepts any of its values.
fn parse_filters(raw: &[String]) -> Result<Option<ChartFilters>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let mut filters = ChartFilters::new();
    for pair in raw {
        let Some((column, value)) = pair.split_once('=') else {
            bail!("filter '{pair}' must look like column=value");
        };
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.into()));
        match filters.get_mut(column) {
            Some(Value::Array(options)) => options.push(value),
            Some(existing) => *existing = Value::Array(vec![existing.take(), value]),
            None => {
                filters.insert(column.to_string(), value);
            }
        }
    }
    Ok(Some(filters))
}
