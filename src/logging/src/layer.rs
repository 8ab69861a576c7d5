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

use crate::severity::Severity;
use crate::trace_context::{REQUEST_SPAN, SPAN_ID_FIELD, TRACE_FIELD, TRACE_SAMPLED_FIELD};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::io::Write;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Subscriber, field, span};
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

const MESSAGE_FIELD: &str = "message";
const SEVERITY_FIELD: &str = "severity";

pub(crate) const TRACE_KEY: &str = "logging.googleapis.com/trace";
pub(crate) const SPAN_ID_KEY: &str = "logging.googleapis.com/spanId";
pub(crate) const TRACE_SAMPLED_KEY: &str = "logging.googleapis.com/trace_sampled";
pub(crate) const SOURCE_LOCATION_KEY: &str = "logging.googleapis.com/sourceLocation";
pub(crate) const LABELS_KEY: &str = "logging.googleapis.com/labels";

/// A [Layer] that writes events as [structured log entries] for Cloud Logging.
///
/// Each event becomes a single line of JSON. The line contains the
/// `severity`, `message` and `timestamp` of the event, the `component` and
/// labels of the layer, the trace of the enclosing
/// [request span][crate::TraceContext::span], and the fields of the event and
/// its enclosing spans.
///
/// [structured log entries]: https://cloud.google.com/logging/docs/structured-logging
pub struct CloudLoggingLayer<W = fn() -> std::io::Stdout> {
    make_writer: W,
    component: Option<String>,
    labels: BTreeMap<String, String>,
}

impl CloudLoggingLayer {
    /// Creates a layer writing to stdout.
    pub fn new() -> Self {
        Self {
            make_writer: std::io::stdout,
            component: None,
            labels: BTreeMap::new(),
        }
    }
}

impl Default for CloudLoggingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> CloudLoggingLayer<W> {
    /// Writes the entries to `make_writer` instead.
    pub fn with_writer<W2>(self, make_writer: W2) -> CloudLoggingLayer<W2>
    where
        W2: for<'w> MakeWriter<'w> + 'static,
    {
        CloudLoggingLayer {
            make_writer,
            component: self.component,
            labels: self.labels,
        }
    }

    /// Sets the `component` of every entry, typically the service name.
    pub fn with_component<S: Into<String>>(mut self, component: S) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Adds a label to every entry.
    pub fn with_label<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

impl<W> std::fmt::Debug for CloudLoggingLayer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudLoggingLayer")
            .field("component", &self.component)
            .field("labels", &self.labels)
            .finish()
    }
}

// The fields recorded on a span, stored in the span extensions.
#[derive(Debug, Default)]
struct SpanFields(Map<String, Value>);

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl field::Visit for JsonVisitor<'_> {
    fn record_str(&mut self, field: &field::Field, value: &str) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &field::Field, value: i64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &field::Field, value: u64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &field::Field, value: f64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &field::Field, value: bool) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_error(&mut self, field: &field::Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_string(), json!(value.to_string()));
    }

    fn record_debug(&mut self, field: &field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), json!(format!("{value:?}")));
    }
}

impl<S, W> Layer<S> for CloudLoggingLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::default();
        attrs.record(&mut JsonVisitor(&mut fields.0));
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut JsonVisitor(&mut fields.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut entry = Map::new();

        // Fields of the enclosing spans, the innermost span wins.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                let Some(fields) = extensions.get::<SpanFields>() else {
                    continue;
                };
                if span.name() == REQUEST_SPAN {
                    insert_trace(&mut entry, &fields.0);
                    continue;
                }
                for (k, v) in &fields.0 {
                    entry.insert(k.clone(), v.clone());
                }
            }
        }

        let mut fields = Map::new();
        event.record(&mut JsonVisitor(&mut fields));
        let message = fields.remove(MESSAGE_FIELD);
        // Cloud Logging has more severities than `tracing` has levels.
        let severity = fields
            .remove(SEVERITY_FIELD)
            .and_then(|v| v.as_str().and_then(Severity::try_from_name))
            .unwrap_or_else(|| Severity::from(event.metadata().level()));
        entry.extend(fields);

        entry.insert(SEVERITY_FIELD.to_string(), json!(severity.as_str()));
        entry.insert(
            MESSAGE_FIELD.to_string(),
            message.unwrap_or_else(|| json!("")),
        );
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        entry.insert("timestamp".to_string(), json!(timestamp));
        if let Some(component) = &self.component {
            entry.insert("component".to_string(), json!(component));
        }
        if !self.labels.is_empty() {
            entry.insert(LABELS_KEY.to_string(), json!(self.labels));
        }
        if severity.has_source_location() {
            let metadata = event.metadata();
            entry.insert(
                SOURCE_LOCATION_KEY.to_string(),
                json!({
                    "file": metadata.file(),
                    "line": metadata.line(),
                    "function": metadata.module_path(),
                }),
            );
        }

        let mut line = Value::Object(entry).to_string();
        line.push('\n');
        // Logging must not fail the application, write errors are dropped.
        let mut writer = self.make_writer.make_writer_for(event.metadata());
        let _ = writer.write_all(line.as_bytes());
    }
}

fn insert_trace(entry: &mut Map<String, Value>, fields: &Map<String, Value>) {
    if let Some(trace) = fields.get(TRACE_FIELD) {
        entry.insert(TRACE_KEY.to_string(), trace.clone());
    }
    if let Some(span_id) = fields.get(SPAN_ID_FIELD) {
        entry.insert(SPAN_ID_KEY.to_string(), span_id.clone());
    }
    if let Some(Value::Bool(true)) = fields.get(TRACE_SAMPLED_FIELD) {
        entry.insert(TRACE_SAMPLED_KEY.to_string(), json!(true));
    }
}
