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

use regex::Regex;
use std::sync::LazyLock;

/// The name of the header set by Google Cloud load balancers and Cloud Run.
pub const TRACE_CONTEXT_HEADER: &str = "x-cloud-trace-context";

/// The name of the span opened by [TraceContext::span].
pub(crate) const REQUEST_SPAN: &str = "request";
pub(crate) const TRACE_FIELD: &str = "trace";
pub(crate) const SPAN_ID_FIELD: &str = "span_id";
pub(crate) const TRACE_SAMPLED_FIELD: &str = "trace_sampled";

// TRACE_ID/SPAN_ID;o=OPTIONS, every part is optional.
static TRACE_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9a-fA-F]+)?(?:/([0-9a-fA-F]+))?(?:;o=([0-9]))?")
        .expect("trace context pattern is valid")
});

/// The trace of the request being served, used to correlate log entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceContext {
    trace: String,
    span_id: Option<String>,
    sampled: bool,
}

impl TraceContext {
    /// Parses the value of an `X-Cloud-Trace-Context` header.
    ///
    /// Returns `None` if the header has no trace id. A span id of `0` means
    /// there is no span.
    pub fn parse(project_id: &str, header: &str) -> Option<Self> {
        let captures = TRACE_CONTEXT.captures(header.trim())?;
        let trace_id = captures.get(1)?.as_str();
        let span_id = captures
            .get(2)
            .map(|m| m.as_str())
            .filter(|s| *s != "0")
            .map(str::to_string);
        let sampled = captures.get(3).is_some_and(|m| m.as_str() == "1");
        Some(Self {
            trace: format!("projects/{project_id}/traces/{trace_id}"),
            span_id,
            sampled,
        })
    }

    /// The trace resource name, `projects/{project_id}/traces/{trace_id}`.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    pub fn sampled(&self) -> bool {
        self.sampled
    }

    /// Opens a span for the request.
    ///
    /// [CloudLoggingLayer][crate::CloudLoggingLayer] adds the trace fields to
    /// every event recorded inside the span.
    ///
    /// ```
    /// # use delegated_logging::TraceContext;
    /// let context = TraceContext::parse("my-project", "105445aa7843bc8bf206b12000100000/1;o=1");
    /// let span = context.map(|c| c.span()).unwrap_or_else(tracing::Span::none);
    /// span.in_scope(|| tracing::info!("handling request"));
    /// ```
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            trace = self.trace.as_str(),
            span_id = self.span_id.as_deref(),
            trace_sampled = self.sampled
        )
    }
}
