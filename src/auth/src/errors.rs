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

//! Errors created while obtaining delegated credentials.

use crate::signer::SigningError;
use http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [ClientFactory][crate::factory::ClientFactory] and its
/// building blocks.
///
/// Every stage of the flow fails fast: the error returned to the application
/// is the first one encountered, annotated with the stage that produced it.
/// None of the stages retry; retry policies are up to the caller.
///
/// The body of an unsuccessful token endpoint response is available via
/// [body][Error::body] for diagnostics but is never part of the `Display`
/// output. Do not echo it to end users.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// A required input (target identity, acting user or scopes) was empty.
    pub fn is_validation(&self) -> bool {
        matches!(self.0, ErrorKind::Validation(_))
    }

    /// The assertion claims could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.0, ErrorKind::Serialization(_))
    }

    /// The signing service could not sign the assertion.
    ///
    /// This includes the case where the target identity is unknown, see
    /// [is_not_found][Error::is_not_found].
    pub fn is_signing(&self) -> bool {
        matches!(self.0, ErrorKind::Signing(_) | ErrorKind::NotFound(_))
    }

    /// The signing service does not know the target identity.
    pub fn is_not_found(&self) -> bool {
        matches!(self.0, ErrorKind::NotFound(_))
    }

    /// The token endpoint returned an unsuccessful HTTP status.
    pub fn is_upstream(&self) -> bool {
        matches!(self.0, ErrorKind::Upstream { .. })
    }

    /// The token endpoint succeeded but its response could not be used.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self.0, ErrorKind::MalformedResponse(_))
    }

    /// The token endpoint could not be reached, or the client could not be
    /// created.
    pub fn is_transport(&self) -> bool {
        matches!(self.0, ErrorKind::Transport(_))
    }

    /// The caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, ErrorKind::Cancelled(_))
    }

    /// The caller's deadline expired before the operation completed.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.0, ErrorKind::DeadlineExceeded(_))
    }

    /// The HTTP status code returned by the token endpoint, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match &self.0 {
            ErrorKind::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body returned by the token endpoint, if any.
    pub fn body(&self) -> Option<&str> {
        match &self.0 {
            ErrorKind::Upstream { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// The stage interrupted by a cancellation or deadline.
    pub fn stage(&self) -> Option<Stage> {
        match &self.0 {
            ErrorKind::Cancelled(stage) | ErrorKind::DeadlineExceeded(stage) => Some(*stage),
            _ => None,
        }
    }

    pub(crate) fn validation(field: &'static str) -> Error {
        Error(ErrorKind::Validation(field))
    }

    pub(crate) fn serialization<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Serialization(source.into()))
    }

    pub(crate) fn signing(source: SigningError) -> Error {
        Error(ErrorKind::Signing(source))
    }

    pub(crate) fn not_found<T: Into<String>>(identity: T, source: SigningError) -> Error {
        Error(ErrorKind::NotFound(NotFoundError {
            identity: identity.into(),
            source,
        }))
    }

    pub(crate) fn upstream(status: StatusCode, body: String) -> Error {
        Error(ErrorKind::Upstream { status, body })
    }

    pub(crate) fn malformed_response<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::MalformedResponse(source.into()))
    }

    pub(crate) fn transport<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::Transport(source.into()))
    }

    pub(crate) fn cancelled(stage: Stage) -> Error {
        Error(ErrorKind::Cancelled(stage))
    }

    pub(crate) fn deadline_exceeded(stage: Stage) -> Error {
        Error(ErrorKind::DeadlineExceeded(stage))
    }
}

/// The stages of the credential flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Signing,
    Exchange,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Signing => write!(f, "signing"),
            Stage::Exchange => write!(f, "exchange"),
        }
    }
}

/// The signing service reported that the target identity does not exist.
#[derive(thiserror::Error, Debug)]
#[error("service account {identity} not found")]
pub struct NotFoundError {
    identity: String,
    #[source]
    source: SigningError,
}

impl NotFoundError {
    /// The identity the signing service did not recognize.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("assertion build failed: {0} must not be empty")]
    Validation(&'static str),
    #[error("assertion build failed: cannot serialize claims: {0}")]
    Serialization(#[source] BoxError),
    #[error("signing failed: {0}")]
    Signing(#[source] SigningError),
    #[error("signing failed: {0}")]
    NotFound(#[source] NotFoundError),
    #[error("exchange failed: token endpoint returned {status}")]
    Upstream { status: StatusCode, body: String },
    #[error("exchange failed: malformed token response: {0}")]
    MalformedResponse(#[source] BoxError),
    #[error("exchange failed: {0}")]
    Transport(#[source] BoxError),
    #[error("{0} failed: operation cancelled")]
    Cancelled(Stage),
    #[error("{0} failed: deadline exceeded")]
    DeadlineExceeded(Stage),
}
