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

use log::debug;
use serde_json::Number;

use crate::{
    blazemeter::{ApiResponse, BlazemeterClient, ErrorReport, RunSnapshot},
    error::AppError,
    fanout,
    grafana::Datapoint,
};

use super::{Metric, extract};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// numeric response code starting with `5`
    ServerError5xx,
    /// response code that is not a number at all
    NonHttp,
}

impl ErrorKind {
    fn matches(self, response_code: &str) -> bool {
        match self {
            ErrorKind::ServerError5xx => {
                response_code.chars().all(|ch| ch.is_ascii_digit())
                    && response_code.starts_with('5')
            }
            ErrorKind::NonHttp => response_code.chars().any(|ch| !ch.is_ascii_digit()),
        }
    }
}

/// Counts errors of `kind` for one run.
///
/// Runs with a zero error percentage are answered without touching the
/// network.
pub async fn fetch_error_count(
    client: &BlazemeterClient,
    run: &RunSnapshot,
    kind: ErrorKind,
) -> Result<Datapoint, AppError> {
    let timestamp_ms = run.timestamp_ms();
    let percent = extract(run, Metric::Errors)?;
    if percent.as_ref().and_then(Number::as_f64) == Some(0.0) {
        return Ok(Datapoint::new(Some(Number::from(0)), timestamp_ms));
    }

    let subject = format!("master {}", run.id);
    let path = format!("masters/{}/reports/errorsreport/data", run.id);
    let response: ApiResponse<Vec<ErrorReport>> = client.fetch_as(&path, &subject).await?;
    let reports = response
        .result
        .ok_or_else(|| AppError::contract(&subject, "error report has no `result`"))?;
    let count = count_errors(&reports, kind);
    Ok(Datapoint::new(Some(count), timestamp_ms))
}

/// Error counts for every run, fetched concurrently, in the order of `runs`.
pub async fn fetch_error_counts(
    client: &BlazemeterClient,
    runs: &[RunSnapshot],
    kind: ErrorKind,
) -> Result<Vec<Datapoint>, AppError> {
    fanout::join_all(runs.iter().cloned().map(|run| {
        let client = client.clone();
        async move { fetch_error_count(&client, &run, kind).await }
    }))
    .await
}

fn count_errors(reports: &[ErrorReport], kind: ErrorKind) -> Number {
    reports
        .first()
        .and_then(|report| {
            report
                .errors
                .iter()
                .find(|entry| kind.matches(&entry.response_code))
        })
        .map(|entry| {
            debug!(
                "matched {kind:?} `{}`: {}",
                entry.response_code,
                entry.message.as_deref().unwrap_or_default()
            );
            entry.count.clone()
        })
        .unwrap_or_else(|| Number::from(0))
}
