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

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::{Number, Value};

/// Standard `{"result": ...}` envelope of the v4 API.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "Option::default")]
    pub result: Option<T>,
}

impl<T: Default> ApiResponse<T> {
    pub fn into_result(self) -> T {
        self.result.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "projectId", default)]
    pub project_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSummary {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// One master (test execution) summary as returned by `masters-summaries`.
///
/// While a run is still executing, most metric families come back as an
/// empty list instead of an object; those decode to [`MetricFamily::Pending`].
#[derive(Debug, Clone, Deserialize)]
pub struct RunSnapshot {
    pub id: i64,
    pub session: Session,
    #[serde(rename = "responseTime", default)]
    pub response_time: MetricFamily,
    #[serde(default)]
    pub hits: MetricFamily,
    #[serde(default)]
    pub size: MetricFamily,
    #[serde(default)]
    pub latency: MetricFamily,
    #[serde(default)]
    pub duration: MetricFamily,
    #[serde(default)]
    pub errors: MetricFamily,
}

impl RunSnapshot {
    /// Ordering key of the run. `created` does not follow completion order.
    pub fn timestamp_ms(&self) -> i64 {
        self.session.updated.saturating_mul(1000)
    }
}

/// Only `updated` is read; `created` and `ended` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub updated: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum MetricFamily {
    Aggregate(Aggregate),
    #[default]
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Avg,
    Std,
    Count,
    Percent,
}

impl Selector {
    pub fn name(self) -> &'static str {
        match self {
            Selector::Avg => "avg",
            Selector::Std => "std",
            Selector::Count => "count",
            Selector::Percent => "percent",
        }
    }
}

impl MetricFamily {
    pub fn select(&self, selector: Selector) -> Option<Number> {
        let MetricFamily::Aggregate(aggregate) = self else {
            return None;
        };
        let value = match selector {
            Selector::Avg => &aggregate.avg,
            Selector::Std => &aggregate.std,
            Selector::Count => &aggregate.count,
            Selector::Percent => &aggregate.percent,
        };
        value.clone()
    }
}

impl<'de> Deserialize<'de> for MetricFamily {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map(MetricFamily::Aggregate)
                .map_err(D::Error::custom),
            _ => Ok(MetricFamily::Pending),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Aggregate {
    pub avg: Option<Number>,
    pub std: Option<Number>,
    pub count: Option<Number>,
    pub percent: Option<Number>,
}

/// `masters/<id>/reports/errorsreport/data`
#[derive(Debug, Deserialize)]
pub struct ErrorReport {
    pub errors: Vec<ErrorEntry>,
}

/// e.g. `{"m": "Internal Server Error", "rc": "500", "count": 26}`; non-HTTP
/// failures carry text in `rc`.
#[derive(Debug, Deserialize)]
pub struct ErrorEntry {
    #[serde(rename = "m", default)]
    pub message: Option<String>,
    #[serde(rename = "rc")]
    pub response_code: String,
    pub count: Number,
}

#[cfg(test)]
pub(crate) fn run_from_json(value: Value) -> RunSnapshot {
    serde_json::from_value(value).expect("valid run snapshot")
}
