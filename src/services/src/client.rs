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

use crate::apierrors::ApiError;
use crate::{Error, Result};
use bytes::Bytes;
use delegated_auth::{Context, Interrupted};
use delegated_auth::factory::ClientFactory;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use std::future::Future;

const NOT_FOUND_ERROR_CODE: &str = "1000";

/// Calls a Google API as a user, through a service account.
#[derive(Clone, Debug)]
pub struct ServiceClient {
    client: reqwest::Client,
    base_endpoint: String,
}

impl ServiceClient {
    /// Creates a client for the API at `base_endpoint`.
    ///
    /// If `target` does not exist the error has status `404 Not Found` and
    /// error code `1000`. Any other failure has status
    /// `500 Internal Server Error`.
    pub async fn new<S: AsRef<str>>(
        ctx: &Context,
        factory: &ClientFactory,
        target: &str,
        acting_user: &str,
        scopes: &[S],
        base_endpoint: &str,
    ) -> std::result::Result<Self, ApiError> {
        match factory
            .get_client(ctx, target, acting_user, scopes, None)
            .await
        {
            Ok(client) => Ok(Self::from_client(client, base_endpoint)),
            Err(e) if e.is_not_found() => {
                let error = ApiError::new(
                    StatusCode::NOT_FOUND,
                    format!("Gaia ID not found for email {target}: {e}"),
                )
                .with_error_code(NOT_FOUND_ERROR_CODE)
                .with_error_message(format!("Gaia ID not found for email {target}"));
                tracing::error!(email = target, "{error}");
                Err(error)
            }
            Err(e) => {
                let error = ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error generating HTTP client: {e}"),
                );
                tracing::error!(error = %e, "{error}");
                Err(error)
            }
        }
    }

    /// Wraps a client that already sends credentials.
    pub fn from_client<S: Into<String>>(client: reqwest::Client, base_endpoint: S) -> Self {
        let base_endpoint: String = base_endpoint.into();
        Self {
            client,
            base_endpoint: base_endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    /// Sends `GET {base_endpoint}/{endpoint}` with `params` as the query.
    pub async fn get<K, V>(&self, ctx: &Context, endpoint: &str, params: &[(K, V)]) -> Result<Bytes>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let query: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();
        let builder = self
            .client
            .get(self.url(endpoint))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .query(&query);
        run(ctx, send(builder)).await
    }

    /// Sends `POST {base_endpoint}/{endpoint}` with `headers` and `body`.
    pub async fn post<B: Into<Bytes>>(
        &self,
        ctx: &Context,
        endpoint: &str,
        headers: &HeaderMap,
        body: B,
    ) -> Result<Bytes> {
        let builder = self
            .client
            .post(self.url(endpoint))
            .headers(headers.clone())
            .body(body.into());
        run(ctx, send(builder)).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_endpoint,
            endpoint.trim_start_matches('/')
        )
    }
}

async fn send(builder: reqwest::RequestBuilder) -> Result<Bytes> {
    let response = builder
        .send()
        .await
        .map_err(Error::transport)
        .inspect_err(|e| tracing::error!(error = %e, "error making API call"))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(Error::transport)
        .inspect_err(|e| tracing::error!(error = %e, "error reading API response"))?;
    if !status.is_success() {
        let body = String::from_utf8_lossy(&body).into_owned();
        tracing::error!(status_code = status.as_u16(), "API request failed");
        tracing::debug!(body = body.as_str(), "API error response body");
        return Err(Error::api(ApiError::new(status, body)));
    }
    Ok(body)
}

async fn run<F, T>(ctx: &Context, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match ctx.run(fut).await {
        Ok(r) => r,
        Err(Interrupted::Cancelled) => Err(Error::cancelled()),
        Err(Interrupted::DeadlineExceeded) => Err(Error::deadline_exceeded()),
    }
}
