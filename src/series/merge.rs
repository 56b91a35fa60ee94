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

//! Time-aligned merge of several tests into one wide table.

use log::{debug, info};

use crate::{
    blazemeter::BlazemeterClient,
    error::AppError,
    fanout,
    grafana::{Datapoint, PanelResult, TableColumn, TableRow, time_cell},
    history::load_history,
    metrics::Metric,
    resolver::ResolvedTest,
};

use super::series_values;

/// One column of the merged table: a label and its datapoints, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    pub label: String,
    pub points: Vec<Datapoint>,
}

/// Loads every test's history concurrently and merges the requested metric
/// into one table keyed on run time. Tests without runs since
/// `from_date_ms` get no column.
pub async fn merge_tests(
    client: &BlazemeterClient,
    tests: &[ResolvedTest],
    search: &str,
    metric: Metric,
    from_date_ms: i64,
) -> Result<PanelResult, AppError> {
    let histories = fanout::join_all(tests.iter().map(|test| {
        let client = client.clone();
        let test = test.clone();
        let search = search.to_string();
        async move {
            debug!(
                "loading test {} `{}` (project {:?})",
                test.id, test.name, test.project_id
            );
            let runs = load_history(&client, test.id, from_date_ms).await?;
            Ok((series_label(&test.name, &search), runs))
        }
    }))
    .await?;

    let series = fanout::join_all(
        histories
            .into_iter()
            .filter(|(label, runs)| {
                if runs.is_empty() {
                    info!("skipping `{label}`: no runs since {from_date_ms}");
                }
                !runs.is_empty()
            })
            .map(|(label, runs)| {
                let client = client.clone();
                async move {
                    let points = series_values(&client, &runs, metric).await?;
                    Ok(LabeledSeries { label, points })
                }
            }),
    )
    .await?;

    Ok(merge_series(series))
}

/// k-way merge of newest-first series.
///
/// Each step takes the newest timestamp under any cursor and emits one row
/// for it: series whose cursor sits on that timestamp contribute their value
/// and advance, all others contribute null. Rows are returned oldest first.
pub fn merge_series(series: Vec<LabeledSeries>) -> PanelResult {
    let series: Vec<LabeledSeries> = series
        .into_iter()
        .filter(|series| !series.points.is_empty())
        .collect();

    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push(TableColumn::time());
    columns.extend(series.iter().map(|series| TableColumn::number(&series.label)));

    let mut cursors = vec![0usize; series.len()];
    let mut rows: Vec<TableRow> = Vec::new();
    loop {
        let newest = series
            .iter()
            .zip(&cursors)
            .filter_map(|(series, &cursor)| series.points.get(cursor))
            .map(|point| point.timestamp_ms)
            .max();
        let Some(timestamp_ms) = newest else {
            break;
        };

        let mut row = Vec::with_capacity(columns.len());
        row.push(time_cell(timestamp_ms));
        for (series, cursor) in series.iter().zip(cursors.iter_mut()) {
            match series.points.get(*cursor) {
                Some(point) if point.timestamp_ms == timestamp_ms => {
                    row.push(point.value.clone());
                    *cursor += 1;
                }
                _ => row.push(None),
            }
        }
        rows.push(row);
    }
    rows.reverse();

    PanelResult::table(columns, rows)
}

/// Column label for a test found by `search`: the test name without the
/// shared search text, or the search text itself when nothing is left.
pub fn series_label(name: &str, search: &str) -> String {
    let stripped = if search.is_empty() {
        name.to_string()
    } else {
        name.replace(search, "")
    };
    if stripped.is_empty() {
        search.to_string()
    } else {
        stripped
    }
}
