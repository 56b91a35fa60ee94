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

use log::{debug, info};
use serde_json::Value;

use crate::{
    blazemeter::{BlazemeterClient, RunSnapshot},
    error::AppError,
};

const HISTORY_PAGE_SIZE: u32 = 100;

/// Loads the recent runs of a test that finished at or after `from_date_ms`,
/// newest first (the order the service returns them in).
pub async fn load_history(
    client: &BlazemeterClient,
    test_id: i64,
    from_date_ms: i64,
) -> Result<Vec<RunSnapshot>, AppError> {
    let path = format!("tests/{test_id}/masters-summaries?limit={HISTORY_PAGE_SIZE}");
    let document = client.fetch(&path).await?;
    let runs = parse_history(test_id, document)?;
    let total = runs.len();
    let runs: Vec<RunSnapshot> = runs
        .into_iter()
        .filter(|run| run.timestamp_ms() >= from_date_ms)
        .collect();
    debug!(
        "test {test_id}: {} of {total} runs since {from_date_ms}",
        runs.len()
    );
    Ok(runs)
}

/// `{"result": {"labels": [run, ...]}}`. Tests that never ran come back with
/// a non-object `result`, which reads as an empty history.
fn parse_history(test_id: i64, document: Value) -> Result<Vec<RunSnapshot>, AppError> {
    let result = match document {
        Value::Object(mut map) => map.remove("result"),
        _ => None,
    };
    let Some(Value::Object(mut result)) = result else {
        info!("no results for test {test_id}");
        return Ok(Vec::new());
    };
    let labels = result
        .remove("labels")
        .ok_or_else(|| AppError::contract(format!("test {test_id}"), "history has no `labels`"))?;
    serde_json::from_value(labels).map_err(|err| AppError::contract(format!("test {test_id}"), err))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::blazemeter::test_client;

    fn history() -> Value {
        json!({"result": {"labels": [
            {"id": 3, "session": {"created": 290, "updated": 300}, "errors": {"percent": 0}},
            {"id": 2, "session": {"created": 190, "updated": 200}, "errors": {"percent": 0}},
            {"id": 1, "session": {"created": 90, "updated": 100}, "errors": {"percent": 0}}
        ]}})
    }

    #[test]
    fn non_object_result_is_empty() {
        assert!(parse_history(1, json!({"result": []})).unwrap().is_empty());
        assert!(parse_history(1, json!({"result": null})).unwrap().is_empty());
        assert!(parse_history(1, json!({})).unwrap().is_empty());
        assert!(parse_history(1, json!([])).unwrap().is_empty());
    }

    #[test]
    fn missing_labels_is_contract_violation() {
        let err = parse_history(8, json!({"result": {"other": []}})).unwrap_err();
        assert!(matches!(err, AppError::RemoteContract { ref subject, .. } if subject == "test 8"));
    }

    #[test]
    fn malformed_run_is_contract_violation() {
        let err = parse_history(8, json!({"result": {"labels": [{"id": "x"}]}})).unwrap_err();
        assert!(matches!(err, AppError::RemoteContract { .. }));
    }

    #[tokio::test]
    async fn filters_by_lower_bound_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tests/6885287/masters-summaries"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let runs = load_history(&client, 6885287, 200_000).await.unwrap();
        let ids: Vec<i64> = runs.iter().map(|run| run.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert!(runs.iter().all(|run| run.timestamp_ms() >= 200_000));
    }

    #[tokio::test]
    async fn zero_bound_keeps_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(history()))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(load_history(&client, 1, 0).await.unwrap().len(), 3);
        assert!(load_history(&client, 1, 300_001).await.unwrap().is_empty());
    }
}
