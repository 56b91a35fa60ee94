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

use std::fmt::Display;

use log::{debug, info};
use serde_json::Value;

use crate::{
    blazemeter::{ApiResponse, BlazemeterClient, ProjectSummary, TestSummary, encode_query_value},
    error::AppError,
    planner::PlannerConfig,
};

const TEST_SEARCH_LIMIT: u32 = 100;
const TEST_LIST_LIMIT: u32 = 10_000;

/// A test or project as named in a dashboard query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    ByName(String),
    ById(i64),
}

impl Descriptor {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Descriptor::ByName(name.clone())),
            Value::Number(number) => number.as_i64().map(Descriptor::ById),
            _ => None,
        }
    }

    /// The id this descriptor denotes on its own, also for all-digit names.
    pub fn numeric_id(&self) -> Option<i64> {
        match self {
            Descriptor::ById(id) => Some(*id),
            Descriptor::ByName(name) => {
                let name = name.trim();
                if !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()) {
                    name.parse().ok()
                } else {
                    None
                }
            }
        }
    }
}

impl Display for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::ByName(name) => write!(f, "{name}"),
            Descriptor::ById(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTest {
    pub id: i64,
    pub name: String,
    pub project_id: Option<i64>,
}

impl From<TestSummary> for ResolvedTest {
    fn from(test: TestSummary) -> Self {
        Self {
            id: test.id,
            name: test.name,
            project_id: test.project_id,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SearchScope {
    Workspace(i64),
    Project(i64),
}

/// Resolves a dashboard descriptor to concrete tests, never returning an
/// empty list.
///
/// A project narrows the search to that project; otherwise a textual test
/// is searched in the workspace. When nothing matches, a numeric descriptor
/// is used as the id and anything else falls back to the configured default
/// test.
pub async fn resolve(
    client: &BlazemeterClient,
    config: &PlannerConfig,
    test: Option<&Descriptor>,
    project: Option<&Descriptor>,
) -> Result<Vec<ResolvedTest>, AppError> {
    let search = test.map(Descriptor::to_string).unwrap_or_default();

    if let Some(project) = project {
        let project_id = resolve_project(client, config, project).await?;
        let tests = search_tests(client, SearchScope::Project(project_id), &search).await?;
        if !tests.is_empty() {
            return Ok(tests);
        }
    }

    if let Some(Descriptor::ByName(name)) = test {
        let tests =
            search_tests(client, SearchScope::Workspace(config.workspace_id), name).await?;
        if !tests.is_empty() {
            return Ok(tests);
        }
    }

    let id = test
        .and_then(Descriptor::numeric_id)
        .unwrap_or(config.default_test_id);
    info!("no test matched `{search}`, using test id {id}");
    Ok(vec![ResolvedTest {
        id,
        name: search,
        project_id: None,
    }])
}

/// Every test of the workspace, for template variables.
pub async fn list_tests(
    client: &BlazemeterClient,
    workspace_id: i64,
) -> Result<Vec<TestSummary>, AppError> {
    let path = format!("tests?workspaceId={workspace_id}&limit={TEST_LIST_LIMIT}");
    let response: ApiResponse<Vec<TestSummary>> =
        client.fetch_as(&path, format!("workspace {workspace_id}")).await?;
    Ok(response.into_result())
}

async fn resolve_project(
    client: &BlazemeterClient,
    config: &PlannerConfig,
    project: &Descriptor,
) -> Result<i64, AppError> {
    let name = match project {
        Descriptor::ById(id) => return Ok(*id),
        Descriptor::ByName(name) => name,
    };
    let path = project_search_path(config.workspace_id, name);
    let response: ApiResponse<Vec<ProjectSummary>> =
        client.fetch_as(&path, format!("project `{name}`")).await?;
    let found = response
        .into_result()
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("bad project {name}")))?;
    debug!("project `{}` resolved to {}", found.name, found.id);
    Ok(found.id)
}

async fn search_tests(
    client: &BlazemeterClient,
    scope: SearchScope,
    name: &str,
) -> Result<Vec<ResolvedTest>, AppError> {
    let path = test_search_path(scope, name);
    let response: ApiResponse<Vec<TestSummary>> =
        client.fetch_as(&path, format!("test search `{name}`")).await?;
    let tests: Vec<ResolvedTest> = response
        .into_result()
        .into_iter()
        .map(ResolvedTest::from)
        .collect();
    debug!("{scope:?} search for `{name}` matched {} tests", tests.len());
    Ok(tests)
}

fn test_search_path(scope: SearchScope, name: &str) -> String {
    let (key, id) = match scope {
        SearchScope::Workspace(id) => ("workspaceId", id),
        SearchScope::Project(id) => ("projectId", id),
    };
    format!(
        "tests?{key}={id}&name={}&limit={TEST_SEARCH_LIMIT}",
        encode_query_value(name)
    )
}

fn project_search_path(workspace_id: i64, name: &str) -> String {
    format!(
        "projects?workspaceId={workspace_id}&name={}",
        encode_query_value(name)
    )
}
