// Copyright 2021 Datafuse Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod merge;

use crate::{
    blazemeter::{BlazemeterClient, RunSnapshot},
    error::AppError,
    grafana::{Datapoint, PanelResult, TableColumn, TableRow, time_cell},
    metrics::{self, Metric, TABLE_METRICS},
};

/// One datapoint per run for `metric`, in the order of `runs`.
///
/// Error-report metrics fetch every run's report concurrently; everything
/// else is read from the summaries.
pub async fn series_values(
    client: &BlazemeterClient,
    runs: &[RunSnapshot],
    metric: Metric,
) -> Result<Vec<Datapoint>, AppError> {
    if let Some(kind) = metric.error_kind() {
        return metrics::fetch_error_counts(client, runs, kind).await;
    }
    runs.iter()
        .map(|run| -> Result<Datapoint, AppError> {
            Ok(Datapoint::new(metrics::extract(run, metric)?, run.timestamp_ms()))
        })
        .collect()
}

/// Time series for one test. `runs` are newest first; datapoints come out
/// oldest first, which the panel tooltip relies on.
pub async fn build_timeseries(
    client: &BlazemeterClient,
    target: &str,
    runs: &[RunSnapshot],
    metric: Metric,
) -> Result<PanelResult, AppError> {
    let mut datapoints = series_values(client, runs, metric).await?;
    datapoints.reverse();
    Ok(PanelResult::timeseries(target, datapoints))
}

/// Table of every summary metric for one test, oldest run first.
pub fn build_table(runs: &[RunSnapshot]) -> Result<PanelResult, AppError> {
    let mut columns = Vec::with_capacity(TABLE_METRICS.len() + 1);
    columns.push(TableColumn::time());
    columns.extend(TABLE_METRICS.iter().map(|metric| TableColumn::number(metric.name())));

    let rows = runs
        .iter()
        .rev()
        .map(table_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PanelResult::table(columns, rows))
}

fn table_row(run: &RunSnapshot) -> Result<TableRow, AppError> {
    let mut row = Vec::with_capacity(TABLE_METRICS.len() + 1);
    row.push(time_cell(run.timestamp_ms()));
    for metric in TABLE_METRICS {
        row.push(metrics::extract(run, metric)?);
    }
    Ok(row)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    use crate::blazemeter::{RunSnapshot, run_from_json};

    /// A finished run whose latency equals `latency`.
    pub fn run(id: i64, updated_secs: i64, latency: Value) -> RunSnapshot {
        run_from_json(json!({
            "id": id,
            "session": {"created": updated_secs - 60, "updated": updated_secs},
            "responseTime": {"avg": 200, "std": 10},
            "hits": {"avg": 50},
            "size": {"avg": 1024},
            "latency": {"avg": latency},
            "duration": {"count": 60},
            "errors": {"percent": 0}
        }))
    }
}
