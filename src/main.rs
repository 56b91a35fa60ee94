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

use std::{net::SocketAddr, time::Duration};

use app::{AppConfig, AppState, router};
use clap::Parser;
use error::AppError;
use log::{LevelFilter, info};

mod app;
mod blazemeter;
mod error;
mod fanout;
mod grafana;
mod history;
mod metrics;
mod planner;
mod resolver;
mod series;

#[derive(Debug, Parser)]
#[command(author, version, about, disable_help_subcommand = true)]
struct Args {
    /// BlazeMeter workspace whose tests are searched and listed
    #[arg(long = "workspace-id", env = "BLAZEMETER_WORKSPACE")]
    workspace_id: i64,
    /// API credentials as `key_id:secret`
    #[arg(long, env = "BLAZEMETER_LOGIN", hide_env_values = true)]
    login: String,
    /// Base URL of the BlazeMeter REST API
    #[arg(long = "api-url", env = "BLAZEMETER_API_URL", default_value = blazemeter::DEFAULT_API_URL)]
    api_url: String,
    /// HTTP bind address for the adapter server
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,
    /// Test used when a dashboard descriptor matches nothing
    #[arg(long = "default-test-id", env = "DEFAULT_TEST_ID", default_value_t = planner::DEFAULT_TEST_ID)]
    default_test_id: i64,
    /// Upper bound on concurrent requests to the API
    #[arg(
        long = "max-concurrent-fetches",
        env = "MAX_CONCURRENT_FETCHES",
        default_value_t = 32
    )]
    max_concurrent_fetches: usize,
    /// Per-request timeout towards the API, in seconds
    #[arg(
        long = "request-timeout-secs",
        env = "REQUEST_TIMEOUT_SECS",
        default_value_t = 30
    )]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    init_logging();
    let args = Args::parse();
    info!(
        "starting blazemeter-grafana-adapter (workspace={}, bind={})",
        args.workspace_id, args.bind
    );
    let config = AppConfig {
        api_url: args.api_url.clone(),
        login: args.login.clone(),
        workspace_id: args.workspace_id,
        default_test_id: args.default_test_id,
        max_concurrent_fetches: args.max_concurrent_fetches,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };
    info!("bootstrapping application state");
    let state = AppState::bootstrap(config)?;
    let app = router(state);

    info!("binding TCP listener on {}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind listener: {err}")))?;
    info!("blazemeter-grafana-adapter listening on {}", args.bind);
    axum::serve(listener, app)
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;
    Ok(())
}

fn init_logging() {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::Builder::from_default_env().init();
    } else {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .filter_module("blazemeter_grafana_adapter", LevelFilter::Info)
            .init();
    }
}
