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

//! Create HTTP clients authenticated as a user, through a service account.
//!
//! A [ClientFactory] looks up a token in the shared [TokenCache]. On a miss it
//! builds a JWT assertion, has it signed on behalf of the target service
//! account, exchanges it for an access token, and caches the result. Any
//! failure aborts the flow and nothing is cached.
//!
//! ```
//! # use delegated_auth::{TokenCache, factory::Builder, signer::IamSigner};
//! # use std::sync::Arc;
//! let factory = Builder::new(IamSigner::new(), Arc::new(TokenCache::new()))
//!     .with_token_url("https://oauth2.googleapis.com/token")
//!     .build();
//! ```

use crate::Result;
use crate::assertion::AssertionBuilder;
use crate::constants::DEFAULT_TOKEN_URL;
use crate::context::Context;
use crate::errors::{Error, Stage};
use crate::exchange::TokenExchanger;
use crate::signer::{Signer, service_account_name};
use crate::token::Token;
use crate::token_cache::TokenCache;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

/// Configures a [ClientFactory].
#[derive(Debug)]
pub struct Builder {
    signer: Signer,
    cache: Arc<TokenCache>,
    token_url: String,
    assertions: AssertionBuilder,
    exchanger: TokenExchanger,
}

impl Builder {
    /// Creates a builder using `signer` to sign assertions and `cache` to
    /// store tokens.
    pub fn new<T: Into<Signer>>(signer: T, cache: Arc<TokenCache>) -> Self {
        Self {
            signer: signer.into(),
            cache,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            assertions: AssertionBuilder::new(),
            exchanger: TokenExchanger::new(),
        }
    }

    /// Sets the OAuth2 token endpoint.
    ///
    /// This does not change the audience of the assertions, see
    /// [with_audience][Builder::with_audience].
    pub fn with_token_url<S: Into<String>>(mut self, url: S) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the `aud` claim of the assertions.
    pub fn with_audience<S: Into<String>>(mut self, audience: S) -> Self {
        self.assertions = self.assertions.with_audience(audience);
        self
    }

    /// Sets the lifetime of the assertions.
    ///
    /// Tokens whose response omits `expires_in` are cached for this long.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.assertions = self.assertions.with_lifetime(lifetime);
        self
    }

    pub fn with_exchanger(mut self, exchanger: TokenExchanger) -> Self {
        self.exchanger = exchanger;
        self
    }

    pub fn build(self) -> ClientFactory {
        ClientFactory {
            signer: self.signer,
            cache: self.cache,
            token_url: self.token_url,
            assertions: self.assertions,
            exchanger: self.exchanger,
        }
    }
}

/// Creates [reqwest::Client] instances that send delegated bearer tokens.
#[derive(Clone, Debug)]
pub struct ClientFactory {
    signer: Signer,
    cache: Arc<TokenCache>,
    token_url: String,
    assertions: AssertionBuilder,
    exchanger: TokenExchanger,
}

impl ClientFactory {
    /// Returns a client authenticated as `acting_user` through `target`.
    ///
    /// `token_url` overrides the token endpoint for this call only.
    ///
    /// Each call creates a new [reqwest::Client], with its own connection
    /// pool, even when the token comes from the cache. Keep the client for
    /// the duration of a request or batch of requests. Services making many
    /// calls with a shared client can use [get_token][ClientFactory::get_token]
    /// and set the `Authorization` header on each request instead.
    #[tracing::instrument(level = "debug", skip(self, ctx, scopes, token_url))]
    pub async fn get_client<S: AsRef<str>>(
        &self,
        ctx: &Context,
        target: &str,
        acting_user: &str,
        scopes: &[S],
        token_url: Option<&str>,
    ) -> Result<reqwest::Client> {
        let token = self
            .get_token(ctx, target, acting_user, scopes, token_url)
            .await?;
        authenticated_client(&token)
    }

    /// Returns a valid token for `acting_user` through `target`, from the
    /// cache if possible.
    pub async fn get_token<S: AsRef<str>>(
        &self,
        ctx: &Context,
        target: &str,
        acting_user: &str,
        scopes: &[S],
        token_url: Option<&str>,
    ) -> Result<Token> {
        let identity = cache_identity(target, acting_user);
        if let Some(token) = self.cache.get_token(&identity, scopes) {
            tracing::debug!("using cached token");
            return Ok(token);
        }

        let assertion = self.assertions.build(target, acting_user, scopes)?;
        let name = service_account_name(target);
        let payload = assertion.payload()?;
        let signed = ctx
            .run_stage(Stage::Signing, async {
                self.signer
                    .sign_jwt(&name, &payload)
                    .await
                    .map_err(|e| {
                        if e.is_identity_not_found() {
                            Error::not_found(target, e)
                        } else {
                            Error::signing(e)
                        }
                    })
            })
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "cannot sign assertion"))?;

        let token_url = token_url.unwrap_or(&self.token_url);
        let response = ctx
            .run_stage(Stage::Exchange, self.exchanger.exchange(token_url, &signed))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "cannot exchange assertion"))?;

        let lifetime = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.assertions.lifetime());
        let token = Token::new(response.access_token, lifetime);
        self.cache.set_token(&identity, scopes, token.clone());
        tracing::debug!(expires_in = lifetime.as_secs(), "cached new token");
        Ok(token)
    }
}

// Tokens for the same user through different service accounts are distinct.
fn cache_identity(target: &str, acting_user: &str) -> String {
    format!("{target}:{acting_user}")
}

fn authenticated_client(token: &Token) -> Result<reqwest::Client> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token))
        .map_err(Error::malformed_response)?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(Error::transport)
}
