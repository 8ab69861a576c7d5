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

//! Call Google APIs on behalf of a user and report failures to clients.
//!
//! [ServiceClient][client::ServiceClient] wraps a client created by
//! [delegated_auth::factory::ClientFactory] with helpers for `GET` and `POST`
//! requests. [handle_error][apierrors::handle_error] turns errors into HTTP
//! responses that do not leak upstream details.

pub mod apierrors;
pub mod client;

pub use apierrors::{ApiError, handle_error};
pub use client::ServiceClient;

/// The result type for [ServiceClient] requests.
pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [ServiceClient] requests.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// The API returned an unsuccessful status.
    pub fn is_api(&self) -> bool {
        matches!(self.0, ErrorKind::Api(_))
    }

    /// The API could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(self.0, ErrorKind::Transport(_))
    }

    /// The caller cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.0, ErrorKind::Cancelled)
    }

    /// The caller's deadline expired before the request completed.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.0, ErrorKind::DeadlineExceeded)
    }

    /// The unsuccessful response, if any.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match &self.0 {
            ErrorKind::Api(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn api(e: ApiError) -> Self {
        Self(ErrorKind::Api(e))
    }

    pub(crate) fn transport<T: Into<BoxError>>(source: T) -> Self {
        Self(ErrorKind::Transport(source.into()))
    }

    pub(crate) fn cancelled() -> Self {
        Self(ErrorKind::Cancelled)
    }

    pub(crate) fn deadline_exceeded() -> Self {
        Self(ErrorKind::DeadlineExceeded)
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error(transparent)]
    Api(ApiError),
    #[error("error making API call: {0}")]
    Transport(#[source] BoxError),
    #[error("API call cancelled")]
    Cancelled,
    #[error("API call deadline exceeded")]
    DeadlineExceeded,
}
