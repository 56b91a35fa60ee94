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

use std::time::Duration;

use log::info;

use crate::{
    blazemeter::{BlazemeterClient, ClientConfig, TestSummary},
    error::AppError,
    grafana::PanelResult,
    planner::{PlannerConfig, QueryPlanner, SeriesRequest},
};

#[derive(Clone)]
pub struct AppState {
    planner: QueryPlanner,
}

impl AppState {
    pub fn bootstrap(config: AppConfig) -> Result<Self, AppError> {
        let AppConfig {
            api_url,
            login,
            workspace_id,
            default_test_id,
            max_concurrent_fetches,
            request_timeout,
        } = config;
        if max_concurrent_fetches == 0 {
            return Err(AppError::Config(
                "max concurrent fetches must be at least 1".into(),
            ));
        }
        let client = BlazemeterClient::new(ClientConfig {
            api_url,
            login,
            max_concurrent_fetches,
            request_timeout,
        })?;
        info!(
            "using API at {} for workspace {workspace_id} (max_concurrent_fetches={max_concurrent_fetches}, timeout={}s)",
            client.base_url(),
            request_timeout.as_secs()
        );
        info!("unmatched test descriptors fall back to test {default_test_id}");
        Ok(Self::new(
            client,
            PlannerConfig {
                workspace_id,
                default_test_id,
            },
        ))
    }

    pub fn new(client: BlazemeterClient, config: PlannerConfig) -> Self {
        Self {
            planner: QueryPlanner::new(client, config),
        }
    }

    pub fn workspace_id(&self) -> i64 {
        self.planner.config().workspace_id
    }

    pub async fn query(
        &self,
        requests: &[SeriesRequest],
        from_date_ms: i64,
    ) -> Result<Vec<PanelResult>, AppError> {
        self.planner.run(requests, from_date_ms).await
    }

    pub async fn list_tests(&self) -> Result<Vec<TestSummary>, AppError> {
        self.planner.list_tests().await
    }
}

pub struct AppConfig {
    pub api_url: String,
    /// `user:password`
    pub login: String,
    pub workspace_id: i64,
    pub default_test_id: i64,
    pub max_concurrent_fetches: usize,
    pub request_timeout: Duration,
}
