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

//! The workload's own credentials, used to call the IAM Credentials API.

use super::{Result, SigningError};
use crate::constants::{
    CLOUD_PLATFORM_SCOPE, GCE_METADATA_HOST_ENV_VAR, MAX_TOKEN_LIFETIME, MDS_DEFAULT_TOKEN_PATH,
    METADATA_FLAVOR, METADATA_FLAVOR_VALUE, METADATA_ROOT,
};
use crate::token::Token;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

/// Provides the bearer token the signer presents to the IAM service.
#[async_trait::async_trait]
pub trait SourceTokenProvider: Send + Sync + std::fmt::Debug {
    async fn token(&self) -> Result<Token>;
}

#[derive(Debug, serde::Deserialize)]
struct MDSTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Fetches tokens for the default service account of the workload from the
/// metadata server.
///
/// The `GCE_METADATA_HOST` environment variable overrides the metadata server
/// address.
#[derive(Clone, Debug)]
pub struct MetadataTokenProvider {
    endpoint: String,
    client: Client,
}

impl MetadataTokenProvider {
    pub fn new() -> Self {
        let endpoint = match std::env::var(GCE_METADATA_HOST_ENV_VAR) {
            Ok(host) => format!("http://{host}"),
            Err(_) => METADATA_ROOT.to_string(),
        };
        Self::with_endpoint(endpoint)
    }

    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

impl Default for MetadataTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SourceTokenProvider for MetadataTokenProvider {
    async fn token(&self) -> Result<Token> {
        let url = format!("{}{MDS_DEFAULT_TOKEN_PATH}", self.endpoint);
        let response = self
            .client
            .get(url)
            .header(METADATA_FLAVOR, METADATA_FLAVOR_VALUE)
            .query(&[("scopes", CLOUD_PLATFORM_SCOPE)])
            .send()
            .await
            .map_err(SigningError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.map_err(SigningError::transport)?;
            return Err(SigningError::transport(format!(
                "metadata server returned {status}: {body}"
            )));
        }

        let response = response
            .json::<MDSTokenResponse>()
            .await
            .map_err(SigningError::parsing)?;
        // Without an expiration the token is refreshed on every call.
        let expires_in = response.expires_in.unwrap_or_default();
        if expires_in > MAX_TOKEN_LIFETIME.as_secs() {
            return Err(SigningError::parsing(format!(
                "metadata server returned expires_in out of range: {expires_in}"
            )));
        }
        let lifetime = Duration::from_secs(expires_in);
        Ok(Token::new(response.access_token, lifetime))
    }
}

/// Caches the token of a [SourceTokenProvider].
///
/// Concurrent callers that find the cached token expired share a single
/// refresh: the first caller fetches a new token, the others wait for it.
#[derive(Debug)]
pub struct SourceToken<T>
where
    T: SourceTokenProvider,
{
    // The cached token, if any.
    token: Arc<Mutex<Option<Token>>>,

    // Tracks if a refresh is ongoing. If the lock is held, there is a refresh.
    refresh_in_progress: Arc<Mutex<()>>,
    // Allows us to await the result of a refresh in multiple tasks.
    refresh_notify: Arc<Notify>,

    inner: Arc<T>,
}

// Manually implemented, a derive would require `T: Clone`.
impl<T: SourceTokenProvider> Clone for SourceToken<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            refresh_in_progress: self.refresh_in_progress.clone(),
            refresh_notify: self.refresh_notify.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: SourceTokenProvider> SourceToken<T> {
    pub fn new(inner: T) -> Self {
        Self {
            token: Arc::new(Mutex::new(None)),
            refresh_in_progress: Arc::new(Mutex::new(())),
            refresh_notify: Arc::new(Notify::new()),
            inner: Arc::new(inner),
        }
    }

    async fn current_token(&self) -> Option<Token> {
        self.token
            .lock()
            .await
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .cloned()
    }
}

#[async_trait::async_trait]
impl<T: SourceTokenProvider + 'static> SourceTokenProvider for SourceToken<T> {
    async fn token(&self) -> Result<Token> {
        loop {
            if let Some(token) = self.current_token().await {
                return Ok(token);
            }

            // Register interest before checking for a refresh, otherwise a
            // refresh completing in between would not wake us up.
            let notified = self.refresh_notify.notified();
            match self.refresh_in_progress.try_lock() {
                Ok(guard) => {
                    let result = self.inner.token().await;
                    if let Ok(token) = &result {
                        *self.token.lock().await = Some(token.clone());
                    }
                    drop(guard);
                    self.refresh_notify.notify_waiters();
                    return result;
                }
                Err(_) => notified.await,
            }
            // A refresh completed. If it failed there is still no token and
            // this caller starts its own refresh.
        }
    }
}
