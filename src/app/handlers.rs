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

use std::time::Instant;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use serde_json::Value;

use crate::{
    error::AppError,
    grafana::{PanelResult, QueryRequest},
};

use super::{
    responses::{TagKey, TagValue, metric_names},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/search", post(list_metrics))
        .route("/metrics", post(list_metrics))
        .route("/query", post(query))
        .route("/annotations", post(annotations))
        .route("/tag-keys", post(tag_keys))
        .route("/tag-values", post(tag_values))
        .with_state(state)
        .layer(middleware::from_fn(log_requests))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// `/search` on older plugin versions, `/metrics` on newer ones.
async fn list_metrics() -> Json<Vec<&'static str>> {
    Json(metric_names())
}

async fn query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<PanelResult>>, AppError> {
    let request = parse_query_request(&body)?;
    let from_date_ms = request.from_date_ms()?;
    let requests = request.series_requests();
    log::debug!(
        "query received: {} targets since {from_date_ms}",
        requests.len()
    );
    let results = state.query(&requests, from_date_ms).await?;
    Ok(Json(results))
}

async fn annotations() -> Json<Vec<Value>> {
    Json(Vec::new())
}

async fn tag_keys() -> Json<Vec<TagKey>> {
    Json(vec![TagKey::test()])
}

async fn tag_values(State(state): State<AppState>) -> Result<Json<Vec<TagValue>>, AppError> {
    let tests = state.list_tests().await?;
    log::debug!(
        "workspace {} has {} tests",
        state.workspace_id(),
        tests.len()
    );
    Ok(Json(tests.into_iter().map(TagValue::from).collect()))
}

/// An empty body is a query without targets.
fn parse_query_request(body: &[u8]) -> Result<QueryRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(QueryRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("invalid query body: {err}")))
}

async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    let elapsed = start.elapsed();
    log::info!(
        "method={} path={} status={} duration_ms={:.3}",
        method,
        uri.path(),
        status.as_u16(),
        elapsed.as_secs_f64() * 1000.0
    );
    response
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::{blazemeter::test_client, planner::PlannerConfig};

    fn app(uri: &str) -> Router {
        router(AppState::new(
            test_client(uri),
            PlannerConfig {
                workspace_id: 315312,
                default_test_id: 6867611,
            },
        ))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[test]
    fn empty_body_is_an_empty_query() {
        let request = parse_query_request(b"").unwrap();
        assert!(request.targets.is_empty());
        assert!(parse_query_request(b" \n").unwrap().targets.is_empty());
        assert!(matches!(
            parse_query_request(b"{not json"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let request = Request::get("/").body(Body::empty()).unwrap();
        let (status, body) = send(app("http://127.0.0.1:9"), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn search_and_metrics_list_the_same_names() {
        let (status, search) =
            send(app("http://127.0.0.1:9"), post_json("/search", json!({"target": ""}))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, metrics) = send(app("http://127.0.0.1:9"), post_json("/metrics", json!({}))).await;
        assert_eq!(search, metrics);
        assert_eq!(search.as_array().unwrap().len(), 9);
        assert_eq!(search[7], json!("500"));
    }

    #[tokio::test]
    async fn annotations_and_tag_keys() {
        let (_, body) = send(app("http://127.0.0.1:9"), post_json("/annotations", json!({}))).await;
        assert_eq!(body, json!([]));
        let (_, body) = send(app("http://127.0.0.1:9"), post_json("/tag-keys", json!({}))).await;
        assert_eq!(body, json!([{"type": "string", "text": "Test"}]));
    }

    #[tokio::test]
    async fn tag_values_list_workspace_tests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tests"))
            .and(query_param("workspaceId", "315312"))
            .and(query_param("limit", "10000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": [
                {"id": 1, "name": "pets-mock", "projectId": 7},
                {"id": 2, "name": "cats-mock"}
            ]})))
            .mount(&server)
            .await;

        let (status, body) = send(app(&server.uri()), post_json("/tag-values", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"text": "pets-mock", "value": 1}, {"text": "cats-mock", "value": 2}])
        );
    }

    #[tokio::test]
    async fn query_returns_one_result_per_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tests"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": [
                {"id": 1, "name": "pets-mock"}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tests/1/masters-summaries"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"labels": [
                {"id": 12, "session": {"updated": 20}, "hits": {"avg": 40}, "errors": {"percent": 0}},
                {"id": 11, "session": {"updated": 10}, "hits": {"avg": 30}, "errors": {"percent": 0}}
            ]}})))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!({
            "targets": [
                {"data": "pets-mock", "target": "hits", "refId": "A", "type": "timeserie"},
                {"data": "pets-mock", "target": "500", "refId": "B", "type": "timeseries"}
            ],
            "scopedVars": {"__from": {"text": "15000", "value": "15000"}}
        });
        let (status, body) = send(app(&server.uri()), post_json("/query", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"target": "hits", "datapoints": [[40, 20000]]},
                {"target": "500", "datapoints": [[0, 20000]]}
            ])
        );
    }

    #[tokio::test]
    async fn bad_from_is_a_client_error() {
        let body = json!({
            "targets": [],
            "scopedVars": {"__from": {"value": "now-6h"}}
        });
        let (status, body) = send(app("http://127.0.0.1:9"), post_json("/query", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("now-6h"));
    }

    #[tokio::test]
    async fn remote_failure_is_a_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let body = json!({"targets": [{"data": "pets-mock", "target": "hits", "type": "table"}]});
        let (status, body) = send(app(&server.uri()), post_json("/query", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().is_some());
    }
}
