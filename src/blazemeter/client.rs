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

use std::{fmt::Display, sync::Arc, time::Duration};

use log::debug;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "https://a.blazemeter.com/api/v4/";

const USER_AGENT_VALUE: &str = concat!("blazemeter-grafana-adapter/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    /// `user:password` (API key id and secret)
    pub login: String,
    pub max_concurrent_fetches: usize,
    pub request_timeout: Duration,
}

/// Authenticated JSON client for the BlazeMeter v4 API.
///
/// Every fetch holds a permit of a shared semaphore while in flight, so the
/// number of concurrent outbound requests is bounded no matter how many
/// tasks a query fans out.
#[derive(Clone)]
pub struct BlazemeterClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: Option<String>,
    permits: Arc<Semaphore>,
}

impl BlazemeterClient {
    pub fn new(config: ClientConfig) -> Result<Self, AppError> {
        let (username, password) = match config.login.split_once(':') {
            Some((user, pass)) => (user.to_string(), Some(pass.to_string())),
            None => {
                return Err(AppError::Config(
                    "login must be in the form `user:password`".into(),
                ));
            }
        };

        let mut api_url = config.api_url.clone();
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let base_url = Url::parse(&api_url)
            .map_err(|err| AppError::Config(format!("invalid api url `{api_url}`: {err}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| AppError::Config(format!("failed to create HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            username,
            password,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches `path` (relative to the API base) and decodes the JSON body.
    pub async fn fetch(&self, path: &str) -> Result<Value, AppError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| AppError::Internal(format!("invalid request path `{path}`: {err}")))?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::Internal("fetch pool is closed".into()))?;

        debug!("GET {url}");
        let response = self
            .http
            .get(url)
            .basic_auth(&self.username, self.password.as_ref())
            .send()
            .await
            .map_err(|source| AppError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                path: path.to_string(),
                status,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|source| AppError::Transport {
                path: path.to_string(),
                source,
            })?;
        debug!("GET {path} done");
        Ok(body)
    }

    /// Fetches `path` and decodes it as `T`. A body that does not match `T`
    /// is a contract violation attributed to `subject`.
    pub async fn fetch_as<T: DeserializeOwned>(
        &self,
        path: &str,
        subject: impl Display,
    ) -> Result<T, AppError> {
        let body = self.fetch(path).await?;
        serde_json::from_value(body).map_err(|err| AppError::contract(subject, err))
    }
}

/// URL-encodes a query value (form style, spaces become `+`).
pub fn encode_query_value(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
pub(crate) fn test_client(uri: &str) -> BlazemeterClient {
    BlazemeterClient::new(ClientConfig {
        api_url: uri.to_string(),
        login: "key:secret".into(),
        max_concurrent_fetches: 4,
        request_timeout: Duration::from_secs(5),
    })
    .expect("test client")
}
