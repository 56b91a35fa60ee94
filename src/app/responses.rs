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

use serde::Serialize;

use crate::{blazemeter::TestSummary, metrics::SUPPORTED_METRICS};

/// Ad-hoc filter key offered to dashboards.
#[derive(Debug, Serialize)]
pub(crate) struct TagKey {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'static str,
}

impl TagKey {
    pub(crate) fn test() -> Self {
        Self {
            kind: "string",
            text: "Test",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TagValue {
    text: String,
    value: i64,
}

impl From<TestSummary> for TagValue {
    fn from(test: TestSummary) -> Self {
        Self {
            text: test.name,
            value: test.id,
        }
    }
}

pub(crate) fn metric_names() -> Vec<&'static str> {
    SUPPORTED_METRICS.iter().map(|metric| metric.name()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lists_every_metric_once() {
        let names = metric_names();
        assert_eq!(
            names,
            vec![
                "time",
                "errors",
                "hits",
                "bandwidth",
                "latency",
                "stdResponseTime",
                "duration",
                "500",
                "non-http"
            ]
        );
    }

    #[test]
    fn tag_shapes() {
        assert_eq!(
            serde_json::to_value(TagKey::test()).unwrap(),
            json!({"type": "string", "text": "Test"})
        );
        let value = TagValue::from(TestSummary {
            id: 6885287,
            name: "pets-mock".into(),
            project_id: None,
        });
        assert_eq!(
            serde_json::to_value(value).unwrap(),
            json!({"text": "pets-mock", "value": 6885287})
        );
    }
}
