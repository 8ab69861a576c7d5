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

//! Map errors to HTTP responses without leaking upstream details.

use http::header::{CONTENT_TYPE, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use http::{Response, StatusCode};

pub(crate) const GENERIC_API_ERROR: &str = "An error occurred while processing your request";
pub(crate) const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// An unsuccessful response from a Google API, or a failure to call it.
///
/// The [body][ApiError::body] and [error message][ApiError::error_message]
/// may contain sensitive details. They are not part of the `Display` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    body: String,
    error_code: Option<String>,
    error_message: Option<String>,
}

impl ApiError {
    pub fn new<T: Into<String>>(status: StatusCode, body: T) -> Self {
        Self {
            status,
            body: body.into(),
            error_code: None,
            error_message: None,
        }
    }

    pub fn with_error_code<T: Into<String>>(mut self, v: T) -> Self {
        self.error_code = Some(v.into());
        self
    }

    pub fn with_error_message<T: Into<String>>(mut self, v: T) -> Self {
        self.error_message = Some(v.into());
        self
    }

    /// The HTTP status reported to the caller.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API request failed with status {}", self.status.as_u16())?;
        if let Some(code) = &self.error_code {
            write!(f, " (Error Code: {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Logs `error` and creates the response sent to the client.
///
/// An [ApiError], directly or wrapped in a [crate::Error], keeps its status
/// code. Any other error becomes a `500 Internal Server Error`. The response
/// body is a generic message in both cases.
pub fn handle_error(error: &(dyn std::error::Error + 'static)) -> Response<String> {
    let api_error = error.downcast_ref::<ApiError>().or_else(|| {
        error
            .downcast_ref::<crate::Error>()
            .and_then(crate::Error::as_api_error)
    });
    let Some(e) = api_error else {
        tracing::error!(error = %error, "Unknown error type");
        return text_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR);
    };

    tracing::error!(
        status_code = e.status.as_u16(),
        error_code = e.error_code(),
        error_message = e.error_message(),
        "API request failed"
    );
    if !e.body.is_empty() {
        tracing::debug!(body = e.body.as_str(), "Detailed error response body");
    }
    text_response(e.status, GENERIC_API_ERROR)
}

fn text_response(status: StatusCode, message: &str) -> Response<String> {
    let mut response = Response::new(format!("{message}\n"));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}
