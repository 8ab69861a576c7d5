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

use super::mds::{MetadataTokenProvider, SourceToken, SourceTokenProvider};
use super::{Result, SigningError, SigningProvider};
use crate::constants::IAM_CREDENTIALS_ENDPOINT;
use reqwest::Client;
use std::sync::Arc;

/// Signs JWTs with the IAM Credentials `signJwt` API.
///
/// The signer authenticates to IAM with the workload's own credentials, by
/// default a token for the workload's service account fetched from the
/// metadata server. The workload's service account needs the
/// `roles/iam.serviceAccountTokenCreator` role on every target service
/// account.
#[derive(Clone, Debug)]
pub struct IamSigner {
    endpoint: String,
    client: Client,
    source: Arc<dyn SourceTokenProvider>,
}

#[derive(Debug, serde::Serialize)]
struct SignJwtRequest<'a> {
    payload: &'a str,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignJwtResponse {
    signed_jwt: String,
}

impl IamSigner {
    pub fn new() -> Self {
        Self {
            endpoint: IAM_CREDENTIALS_ENDPOINT.to_string(),
            client: Client::new(),
            source: Arc::new(SourceToken::new(MetadataTokenProvider::new())),
        }
    }

    /// Overrides the IAM Credentials endpoint.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the credentials used to call the IAM Credentials API.
    pub fn with_source<T: SourceTokenProvider + 'static>(mut self, source: T) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Overrides the HTTP client used to call the IAM Credentials API.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }
}

impl Default for IamSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SigningProvider for IamSigner {
    async fn sign_jwt(&self, name: &str, payload: &str) -> Result<String> {
        let source = self.source.token().await?;
        let url = format!("{}/v1/{name}:signJwt", self.endpoint);
        let response = self
            .client
            .post(url)
            .bearer_auth(&source.token)
            .json(&SignJwtRequest { payload })
            .send()
            .await
            .map_err(SigningError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.map_err(SigningError::transport)?;
            tracing::debug!(%status, name, "signJwt request failed");
            return Err(SigningError::api(status, body));
        }

        let response = response
            .json::<SignJwtResponse>()
            .await
            .map_err(SigningError::parsing)?;
        Ok(response.signed_jwt)
    }
}
