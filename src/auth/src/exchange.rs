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

//! Exchange signed assertions for access tokens.

use crate::Result;
use crate::constants::{JWT_BEARER_GRANT_TYPE, MAX_TOKEN_LIFETIME};
use crate::errors::Error;
use http::header::HeaderValue;
use reqwest::Client;

/// A successful response from the OAuth2 token endpoint.
#[derive(Clone, PartialEq, serde::Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// The lifetime of the access token, in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[censored]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Performs the OAuth2 JWT-bearer grant.
#[derive(Clone, Debug, Default)]
pub struct TokenExchanger {
    client: Client,
}

impl TokenExchanger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `client` to reach the token endpoint.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Exchanges `signed_jwt` for an access token at `token_url`.
    pub async fn exchange(&self, token_url: &str, signed_jwt: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", signed_jwt),
        ];
        let response = self
            .client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::transport)?;
        if !status.is_success() {
            tracing::debug!(%status, token_url, "token endpoint rejected the assertion");
            return Err(Error::upstream(status, body));
        }

        let token =
            serde_json::from_str::<TokenResponse>(&body).map_err(Error::malformed_response)?;
        if token.access_token.is_empty() {
            return Err(Error::malformed_response("empty access_token"));
        }
        // The token must be usable in an `Authorization` header.
        HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map_err(Error::malformed_response)?;
        if let Some(expires_in) = token
            .expires_in
            .filter(|s| *s > MAX_TOKEN_LIFETIME.as_secs())
        {
            return Err(Error::malformed_response(format!(
                "expires_in out of range: {expires_in}"
            )));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use httptest::matchers::{all_of, contains, request, url_decoded};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use serde_json::json;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    #[tokio::test]
    async fn exchange_success() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/token"),
                request::headers(contains((
                    "content-type",
                    "application/x-www-form-urlencoded"
                ))),
                request::body(url_decoded(contains(("grant_type", JWT_BEARER_GRANT_TYPE)))),
                request::body(url_decoded(contains(("assertion", "mocked_signed_jwt")))),
            ])
            .respond_with(json_encoded(json!({"access_token": "T"}))),
        );

        let url = server.url("/token").to_string();
        let got = TokenExchanger::new()
            .exchange(&url, "mocked_signed_jwt")
            .await?;
        assert_eq!(got.access_token, "T");
        assert_eq!(got.expires_in, None);
        assert_eq!(got.token_type, None);
        Ok(())
    }

    #[tokio::test]
    async fn exchange_full_response() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/token")).respond_with(
                json_encoded(json!({
                    "access_token": "T",
                    "expires_in": 3599,
                    "token_type": "Bearer",
                })),
            ),
        );

        let url = server.url("/token").to_string();
        let got = TokenExchanger::with_client(Client::new())
            .exchange(&url, "jwt")
            .await?;
        assert_eq!(got.expires_in, Some(3599));
        assert_eq!(got.token_type.as_deref(), Some("Bearer"));
        assert!(!format!("{got:?}").contains("\"T\""), "{got:?}");
        Ok(())
    }

    #[tokio::test]
    async fn exchange_bad_request() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/token"))
                .respond_with(status_code(400).body("bad request")),
        );

        let url = server.url("/token").to_string();
        let err = TokenExchanger::new()
            .exchange(&url, "jwt")
            .await
            .unwrap_err();
        assert!(err.is_upstream(), "{err:?}");
        assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.body(), Some("bad request"));
        assert!(err.to_string().starts_with("exchange failed:"), "{err}");
        Ok(())
    }

    #[test_case("not json"; "not json")]
    #[test_case(r#"{"token_type":"Bearer"}"#; "missing access token")]
    #[test_case(r#"{"access_token":""}"#; "empty access token")]
    #[test_case(r#"{"access_token":42}"#; "wrong type")]
    #[test_case(r#"{"access_token":"bad\nvalue"}"#; "invalid header value")]
    #[test_case(r#"{"access_token":"T","expires_in":18446744073709551615}"#; "expires_in overflow")]
    #[test_case(r#"{"access_token":"T","expires_in":-1}"#; "negative expires_in")]
    #[tokio::test]
    async fn exchange_malformed(body: &'static str) -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/token"))
                .respond_with(status_code(200).body(body)),
        );

        let url = server.url("/token").to_string();
        let err = TokenExchanger::new()
            .exchange(&url, "jwt")
            .await
            .unwrap_err();
        assert!(err.is_malformed_response(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn exchange_transport() -> TestResult {
        // Nothing listens on the discard port.
        let err = TokenExchanger::new()
            .exchange("http://127.0.0.1:9/token", "jwt")
            .await
            .unwrap_err();
        assert!(err.is_transport(), "{err:?}");
        Ok(())
    }
}
