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

//! Wire model of the Grafana JSON datasource protocol.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Number, Value};

use crate::{
    error::AppError,
    metrics::{Metric, MetricValue},
    planner::SeriesRequest,
    resolver::Descriptor,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Datapoint {
    pub value: MetricValue,
    pub timestamp_ms: i64,
}

impl Datapoint {
    pub fn new(value: MetricValue, timestamp_ms: i64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }
}

/// Serialised as `[value, timestamp_ms]`.
impl Serialize for Datapoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.value, self.timestamp_ms).serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Time,
    Number,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
}

impl TableColumn {
    pub fn time() -> Self {
        Self {
            text: "Time".into(),
            kind: ColumnType::Time,
        }
    }

    pub fn number(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ColumnType::Number,
        }
    }
}

/// Values aligned 1:1 with the table columns; the time column holds epoch ms.
pub type TableRow = Vec<MetricValue>;

pub fn time_cell(timestamp_ms: i64) -> MetricValue {
    Some(Number::from(timestamp_ms))
}

/// One entry of the `/query` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PanelResult {
    Timeseries(TimeseriesResult),
    Table(TableResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeseriesResult {
    pub target: String,
    /// earliest first
    pub datapoints: Vec<Datapoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableResult {
    #[serde(rename = "type")]
    kind: &'static str,
    pub columns: Vec<TableColumn>,
    /// earliest first
    pub rows: Vec<TableRow>,
}

impl PanelResult {
    pub fn timeseries(target: impl Into<String>, datapoints: Vec<Datapoint>) -> Self {
        PanelResult::Timeseries(TimeseriesResult {
            target: target.into(),
            datapoints,
        })
    }

    pub fn table(columns: Vec<TableColumn>, rows: Vec<TableRow>) -> Self {
        PanelResult::Table(TableResult {
            kind: "table",
            columns,
            rows,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Timeseries,
    Table,
}

impl Shape {
    /// `timeserie` is what the older simple-JSON plugin sends. Anything that
    /// is not a time series is rendered as a table.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("timeseries") | Some("timeserie") => Shape::Timeseries,
            _ => Shape::Table,
        }
    }
}

/// Body of `/query`, e.g.
///
/// ```json
/// {
///   "targets": [{"data": "test name", "target": "latency", "refId": "A", "type": "timeseries"}],
///   "scopedVars": {"__from": {"text": "1568013989863", "value": "1568013989863"}}
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub targets: Vec<QueryTarget>,
    #[serde(rename = "scopedVars", default)]
    pub scoped_vars: Option<ScopedVars>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScopedVars {
    #[serde(rename = "__from", default)]
    pub from: Option<ScopedVar>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScopedVar {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryTarget {
    #[serde(default)]
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// test descriptor: a name, an id, or `{"test": .., "project": ..}`
    #[serde(default)]
    pub data: Value,
}

impl QueryRequest {
    /// Lower bound of the dashboard range in epoch ms, 0 when absent.
    pub fn from_date_ms(&self) -> Result<i64, AppError> {
        let Some(value) = self
            .scoped_vars
            .as_ref()
            .and_then(|vars| vars.from.as_ref())
            .map(|from| &from.value)
        else {
            return Ok(0);
        };
        match value {
            Value::Null => Ok(0),
            Value::Number(number) => number
                .as_i64()
                .ok_or_else(|| AppError::BadRequest(format!("invalid __from value {number}"))),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|err| AppError::BadRequest(format!("invalid __from value `{text}`: {err}"))),
            other => Err(AppError::BadRequest(format!(
                "invalid __from value {other}"
            ))),
        }
    }

    pub fn series_requests(&self) -> Vec<SeriesRequest> {
        self.targets.iter().map(QueryTarget::to_series_request).collect()
    }
}

impl QueryTarget {
    pub fn to_series_request(&self) -> SeriesRequest {
        let (test, project) = match &self.data {
            Value::Object(map) => (
                map.get("test").and_then(Descriptor::from_value),
                map.get("project").and_then(Descriptor::from_value),
            ),
            other => (Descriptor::from_value(other), None),
        };
        SeriesRequest {
            target: self.target.clone(),
            test,
            project,
            metric: Metric::parse(&self.target),
            shape: Shape::parse(self.kind.as_deref()),
        }
    }
}
