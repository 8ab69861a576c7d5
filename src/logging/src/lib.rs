// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Structured logging for services running on Google Cloud.
//!
//! Cloud Run, Cloud Functions and GKE forward the standard output of a
//! service to Cloud Logging. Lines containing a JSON object become
//! [structured log entries]: the `severity`, `message` and a few special
//! fields are interpreted by Cloud Logging, everything else is stored as the
//! entry payload.
//!
//! This crate provides a [tracing_subscriber::Layer] producing such lines, so
//! services log with the `tracing` macros:
//!
//! ```no_run
//! # fn main() -> Result<(), delegated_logging::InitError> {
//! delegated_logging::init(delegated_logging::Config::from_env())?;
//! tracing::info!(user = "user@example.com", "request accepted");
//! # Ok(()) }
//! ```
//!
//! [structured log entries]: https://cloud.google.com/logging/docs/structured-logging

mod layer;
mod severity;
mod trace_context;

pub use layer::CloudLoggingLayer;
pub use severity::Severity;
pub use trace_context::{TRACE_CONTEXT_HEADER, TraceContext};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";
const RUST_LOG_ENV_VAR: &str = "RUST_LOG";
const PROJECT_ENV_VAR: &str = "GOOGLE_CLOUD_PROJECT";
const SERVICE_ENV_VAR: &str = "K_SERVICE";

/// Configures the global subscriber installed by [init].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    /// The project used to format trace names, see [TraceContext::parse].
    pub project_id: Option<String>,
    /// Set as the `component` of every entry.
    pub component: Option<String>,
    /// The minimum severity of the entries. Defaults to `INFO`.
    pub level: Option<Severity>,
    /// `EnvFilter` directives, for example `delegated_auth=debug`. Overrides
    /// [level][Config::level].
    pub filter: Option<String>,
}

impl Config {
    /// Reads the configuration from the environment.
    ///
    /// | variable | field |
    /// |----------|-------|
    /// | `GOOGLE_CLOUD_PROJECT` | `project_id` |
    /// | `K_SERVICE` | `component` |
    /// | `LOG_LEVEL` | `level` |
    /// | `RUST_LOG` | `filter` |
    pub fn from_env() -> Self {
        let var = |name| std::env::var(name).ok().filter(|v: &String| !v.is_empty());
        Self {
            project_id: var(PROJECT_ENV_VAR),
            component: var(SERVICE_ENV_VAR),
            level: var(LOG_LEVEL_ENV_VAR).map(|v| Severity::from_name(&v)),
            filter: var(RUST_LOG_ENV_VAR),
        }
    }

    pub fn with_project_id<S: Into<String>>(mut self, v: S) -> Self {
        self.project_id = Some(v.into());
        self
    }

    pub fn with_component<S: Into<String>>(mut self, v: S) -> Self {
        self.component = Some(v.into());
        self
    }

    pub fn with_level(mut self, v: Severity) -> Self {
        self.level = Some(v);
        self
    }

    pub fn with_filter<S: Into<String>>(mut self, v: S) -> Self {
        self.filter = Some(v.into());
        self
    }

    /// Parses a `X-Cloud-Trace-Context` header using the configured project.
    pub fn trace_context(&self, header: &str) -> Option<TraceContext> {
        TraceContext::parse(self.project_id.as_deref().unwrap_or_default(), header)
    }

    /// The filter selecting which events are logged.
    pub fn env_filter(&self) -> Result<EnvFilter, InitError> {
        match &self.filter {
            Some(directives) => EnvFilter::builder()
                .parse(directives)
                .map_err(|e| InitError(InitErrorKind::Filter(e))),
            None => {
                let level = LevelFilter::from(self.level.unwrap_or(Severity::Info));
                Ok(EnvFilter::builder()
                    .with_default_directive(level.into())
                    .parse_lossy(""))
            }
        }
    }

    /// The layer formatting the entries.
    pub fn layer(&self) -> CloudLoggingLayer {
        let layer = CloudLoggingLayer::new();
        match &self.component {
            Some(c) => layer.with_component(c.clone()),
            None => layer,
        }
    }
}

/// Installs a global subscriber writing Cloud Logging entries to stdout.
pub fn init(config: Config) -> Result<(), InitError> {
    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(config.layer())
        .try_init()
        .map_err(|e| InitError(InitErrorKind::AlreadyInitialized(e)))
}

/// The error returned by [init].
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct InitError(InitErrorKind);

impl InitError {
    /// The filter directives could not be parsed.
    pub fn is_filter(&self) -> bool {
        matches!(self.0, InitErrorKind::Filter(_))
    }

    /// A global subscriber is already installed.
    pub fn is_already_initialized(&self) -> bool {
        matches!(self.0, InitErrorKind::AlreadyInitialized(_))
    }
}

#[derive(thiserror::Error, Debug)]
enum InitErrorKind {
    #[error("invalid log filter: {0}")]
    Filter(#[source] tracing_subscriber::filter::ParseError),
    #[error("cannot install the log subscriber: {0}")]
    AlreadyInitialized(#[source] tracing_subscriber::util::TryInitError),
}
