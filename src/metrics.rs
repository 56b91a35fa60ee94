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

mod errors;

pub use errors::{ErrorKind, fetch_error_counts};

use serde_json::Number;

use crate::{
    blazemeter::{MetricFamily, RunSnapshot, Selector},
    error::AppError,
};

/// Nullable scalar. `None` means the run has not reported this value yet and
/// must never be rendered as zero.
pub type MetricValue = Option<Number>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// average response time
    Time,
    /// error percentage
    Errors,
    /// average hits per second
    Hits,
    /// average bandwidth
    Bandwidth,
    Latency,
    StdResponseTime,
    /// test duration
    Duration,
    /// count of HTTP 5xx responses (needs the error report)
    ServerErrors,
    /// count of non-HTTP failures (needs the error report)
    NonHttpErrors,
}

/// Everything `/search` advertises, in display order.
pub const SUPPORTED_METRICS: [Metric; 9] = [
    Metric::Time,
    Metric::Errors,
    Metric::Hits,
    Metric::Bandwidth,
    Metric::Latency,
    Metric::StdResponseTime,
    Metric::Duration,
    Metric::ServerErrors,
    Metric::NonHttpErrors,
];

/// Value columns of a single-test table.
pub const TABLE_METRICS: [Metric; 7] = [
    Metric::Time,
    Metric::Errors,
    Metric::Hits,
    Metric::Bandwidth,
    Metric::Latency,
    Metric::StdResponseTime,
    Metric::Duration,
];

const LEGACY_STD_RESPONSE_TIME: &str = "standard deviation of response time";

impl Metric {
    /// Unknown names select the error percentage.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "time" => Metric::Time,
            "hits" => Metric::Hits,
            "bandwidth" => Metric::Bandwidth,
            "latency" => Metric::Latency,
            "stdResponseTime" | LEGACY_STD_RESPONSE_TIME => Metric::StdResponseTime,
            "duration" => Metric::Duration,
            "500" => Metric::ServerErrors,
            "non-http" => Metric::NonHttpErrors,
            _ => Metric::Errors,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Errors => "errors",
            Metric::Hits => "hits",
            Metric::Bandwidth => "bandwidth",
            Metric::Latency => "latency",
            Metric::StdResponseTime => "stdResponseTime",
            Metric::Duration => "duration",
            Metric::ServerErrors => "500",
            Metric::NonHttpErrors => "non-http",
        }
    }

    /// Metrics served from the per-run error report rather than the summary.
    pub fn error_kind(self) -> Option<ErrorKind> {
        match self {
            Metric::ServerErrors => Some(ErrorKind::ServerError5xx),
            Metric::NonHttpErrors => Some(ErrorKind::NonHttp),
            _ => None,
        }
    }
}

/// Reads `metric` from a run summary.
///
/// Families that may still be pending yield `None`; `errors`, `hits` and
/// `duration` are always reported by the service, so their absence is a
/// contract violation. The error-report metrics fall back to the error
/// percentage here; [`fetch_error_counts`] serves their real value.
pub fn extract(run: &RunSnapshot, metric: Metric) -> Result<MetricValue, AppError> {
    match metric {
        Metric::Time => Ok(run.response_time.select(Selector::Avg)),
        Metric::Bandwidth => Ok(run.size.select(Selector::Avg)),
        Metric::Latency => Ok(run.latency.select(Selector::Avg)),
        Metric::StdResponseTime => Ok(run.response_time.select(Selector::Std)),
        Metric::Hits => required(run, &run.hits, "hits", Selector::Avg),
        Metric::Duration => required(run, &run.duration, "duration", Selector::Count),
        Metric::Errors | Metric::ServerErrors | Metric::NonHttpErrors => {
            required(run, &run.errors, "errors", Selector::Percent)
        }
    }
}

fn required(
    run: &RunSnapshot,
    family: &MetricFamily,
    family_name: &str,
    selector: Selector,
) -> Result<MetricValue, AppError> {
    family.select(selector).map(Some).ok_or_else(|| {
        AppError::contract(
            format!("master {}", run.id),
            format!("missing `{family_name}.{}`", selector.name()),
        )
    })
}
