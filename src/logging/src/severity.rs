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

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

/// The severity of a log entry, as defined by Cloud Logging.
///
/// Cloud Logging has more severities than `tracing` has levels. Events
/// recorded at a `tracing` level map to [Debug][Severity::Debug],
/// [Info][Severity::Info], [Warning][Severity::Warning], or
/// [Error][Severity::Error]. Use a `severity` field to record the others:
///
/// ```
/// tracing::error!(severity = "CRITICAL", "the database is unreachable");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug = 100,
    Info = 200,
    Notice = 300,
    Warning = 400,
    Error = 500,
    Critical = 600,
    Alert = 700,
    Emergency = 800,
}

impl Severity {
    /// The numeric value used by Cloud Logging.
    pub fn value(self) -> u16 {
        self as u16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }

    /// Parses a severity name, ignoring case.
    ///
    /// Unknown names are treated as [Info][Severity::Info].
    pub fn from_name(name: &str) -> Self {
        Self::try_from_name(name).unwrap_or(Severity::Info)
    }

    pub(crate) fn try_from_name(name: &str) -> Option<Self> {
        let severity = match name.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Severity::Debug,
            "INFO" => Severity::Info,
            "NOTICE" => Severity::Notice,
            "WARNING" => Severity::Warning,
            "ERROR" => Severity::Error,
            "CRITICAL" => Severity::Critical,
            "ALERT" => Severity::Alert,
            "EMERGENCY" => Severity::Emergency,
            _ => return None,
        };
        Some(severity)
    }

    /// Entries at this severity include their source location.
    pub fn has_source_location(self) -> bool {
        self >= Severity::Error
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&Level> for Severity {
    fn from(level: &Level) -> Self {
        match *level {
            Level::TRACE | Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR => Severity::Error,
        }
    }
}

// `tracing` filters by level, the closest level that lets the severity
// through is used.
impl From<Severity> for LevelFilter {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => LevelFilter::DEBUG,
            Severity::Info | Severity::Notice => LevelFilter::INFO,
            Severity::Warning => LevelFilter::WARN,
            _ => LevelFilter::ERROR,
        }
    }
}
