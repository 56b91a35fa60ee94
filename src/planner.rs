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

use crate::{
    blazemeter::{BlazemeterClient, RunSnapshot, TestSummary},
    error::AppError,
    grafana::{PanelResult, Shape},
    history::load_history,
    metrics::Metric,
    resolver::{self, Descriptor},
    series::{self, merge},
};

pub const DEFAULT_TEST_ID: i64 = 6867611;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub workspace_id: i64,
    /// used when a textual descriptor matches no test
    pub default_test_id: i64,
}

/// One panel target after decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRequest {
    /// the metric name as the dashboard sent it, echoed back on time series
    pub target: String,
    pub test: Option<Descriptor>,
    pub project: Option<Descriptor>,
    pub metric: Metric,
    pub shape: Shape,
}

impl SeriesRequest {
    /// Text shared by every test a search matched; stripped from merge labels.
    fn search_text(&self) -> String {
        self.test.as_ref().map(Descriptor::to_string).unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct QueryPlanner {
    client: BlazemeterClient,
    config: PlannerConfig,
}

impl QueryPlanner {
    pub fn new(client: BlazemeterClient, config: PlannerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Answers every target in order. Any failure fails the whole query.
    ///
    /// A table over several matched tests is merged; everything else is
    /// served from the first matched test, whose history is reused while
    /// consecutive targets resolve to the same test.
    pub async fn run(
        &self,
        requests: &[SeriesRequest],
        from_date_ms: i64,
    ) -> Result<Vec<PanelResult>, AppError> {
        let mut loaded: Option<(i64, Vec<RunSnapshot>)> = None;
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let tests = resolver::resolve(
                &self.client,
                &self.config,
                request.test.as_ref(),
                request.project.as_ref(),
            )
            .await?;

            if request.shape == Shape::Table && tests.len() > 1 {
                debug!(
                    "merging {} tests for `{}` ({})",
                    tests.len(),
                    request.search_text(),
                    request.metric.name()
                );
                let result = merge::merge_tests(
                    &self.client,
                    &tests,
                    &request.search_text(),
                    request.metric,
                    from_date_ms,
                )
                .await?;
                results.push(result);
                continue;
            }

            let test_id = tests
                .first()
                .map(|test| test.id)
                .ok_or_else(|| AppError::Internal("test resolution returned nothing".into()))?;
            if loaded.as_ref().map(|(id, _)| *id) != Some(test_id) {
                let runs = load_history(&self.client, test_id, from_date_ms).await?;
                loaded = Some((test_id, runs));
            } else {
                debug!("reusing history of test {test_id}");
            }
            let runs = loaded
                .as_ref()
                .map(|(_, runs)| runs.as_slice())
                .unwrap_or_default();

            let result = match request.shape {
                Shape::Timeseries => {
                    series::build_timeseries(&self.client, &request.target, runs, request.metric)
                        .await?
                }
                Shape::Table => series::build_table(runs)?,
            };
            results.push(result);
        }

        Ok(results)
    }

    pub async fn list_tests(&self) -> Result<Vec<TestSummary>, AppError> {
        resolver::list_tests(&self.client, self.config.workspace_id).await
    }
}
