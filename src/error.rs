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

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// The remote service answered with a document we cannot interpret.
    #[error("unexpected response for {subject}: {message}")]
    RemoteContract { subject: String, message: String },
    #[error("request to `{path}` failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to `{path}` returned {status}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn contract(subject: impl Display, message: impl Display) -> Self {
        Self::RemoteContract {
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_)
            | Self::RemoteContract { .. }
            | Self::Transport { .. }
            | Self::Status { .. }
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log::error!("request failed: {self}");
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_error_names_subject() {
        let err = AppError::contract("master 42", "missing `errors`");
        assert_eq!(
            err.to_string(),
            "unexpected response for master 42: missing `errors`"
        );
    }

    #[test]
    fn bad_request_maps_to_400() {
        let response = AppError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_maps_to_500() {
        let response = AppError::NotFound("bad project Finch".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
