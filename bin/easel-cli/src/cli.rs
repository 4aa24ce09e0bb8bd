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

use clap::{Parser, Subcommand};
use easel::ChartType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "easel")]
#[command(about = "Profile datasets, apply processing recommendations and shape chart data")]
#[command(version)]
pub struct Args {
    #[arg(long, global = true, help = "Path to an easel.toml configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "Set the logging level")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Column profiles and dataset shape.
    Profile { file: PathBuf },

    /// Numeric summaries and categorical value counts.
    Stats { file: PathBuf },

    Preview {
        file: PathBuf,
        #[arg(long, default_value_t = 10)]
        rows: usize,
    },

    /// Suggests columns to keep for a stated analysis goal.
    Recommend {
        file: PathBuf,
        #[arg(long)]
        use_case: String,
    },

    /// Applies a recommendation document and prints the processing log.
    Process {
        file: PathBuf,
        recommendation: PathBuf,
        #[arg(long, help = "Write the processed dataset as CSV")]
        output: Option<PathBuf>,
    },

    /// Applies a JSON list of ad-hoc operations in order.
    Custom {
        file: PathBuf,
        operations: PathBuf,
        #[arg(long, help = "Write the processed dataset as CSV")]
        output: Option<PathBuf>,
    },

    /// Checks a chart type against the selected axes.
    Validate {
        file: PathBuf,
        #[command(flatten)]
        axes: ChartAxes,
    },

    /// Prints the records a chart of the given type renders.
    Chart {
        file: PathBuf,
        #[command(flatten)]
        axes: ChartAxes,
        #[arg(long, default_value = "Chart")]
        title: String,
        #[arg(long = "filter", value_name = "COLUMN=VALUE")]
        filters: Vec<String>,
    },

    /// Starter charts chosen from the column roles of a dataset.
    Visualize { file: PathBuf },

    /// Lists the supported chart families.
    ChartTypes,

    /// Picks a default chart type for the selected axes.
    Suggest {
        file: PathBuf,
        #[arg(short = 'x', long)]
        x_axis: String,
        #[arg(short = 'y', long = "y-axis", required = true)]
        y_axes: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ChartAxes {
    #[arg(long)]
    pub chart: ChartType,
    #[arg(short = 'x', long)]
    pub x_axis: String,
    #[arg(short = 'y', long = "y-axis")]
    pub y_axes: Vec<String>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}
