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

//! Build the JWT claim sets used in the JWT-bearer grant.
//!
//! With domain-wide delegation the target service account is the issuer of
//! the assertion and the acting user is its subject. The token endpoint
//! returns an access token for the user, scoped to the requested scopes.

use crate::Result;
use crate::constants::{DEFAULT_LIFETIME, DEFAULT_TOKEN_URL};
use crate::errors::Error;
use crate::token_cache::canonical_scopes;
use std::time::Duration;
use time::OffsetDateTime;

/// The claim set of a JWT-bearer assertion.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct JwtAssertion {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    #[serde(with = "time::serde::timestamp")]
    pub iat: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub exp: OffsetDateTime,
}

impl JwtAssertion {
    /// The JSON claim set, as sent to the signer.
    pub fn payload(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::serialization)
    }
}

/// Creates [JwtAssertion] instances.
#[derive(Clone, Debug)]
pub struct AssertionBuilder {
    audience: String,
    lifetime: Duration,
}

impl Default for AssertionBuilder {
    fn default() -> Self {
        Self {
            audience: DEFAULT_TOKEN_URL.to_string(),
            lifetime: DEFAULT_LIFETIME,
        }
    }
}

impl AssertionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `aud` claim. Defaults to `https://oauth2.googleapis.com/token`.
    pub fn with_audience<S: Into<String>>(mut self, audience: S) -> Self {
        self.audience = audience.into();
        self
    }

    /// Sets the validity of the assertion. Defaults to one hour.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Builds the claims for `acting_user`, issued by `target`.
    ///
    /// Empty strings in `scopes` are ignored, but at least one non-empty
    /// scope is required.
    pub fn build<S: AsRef<str>>(
        &self,
        target: &str,
        acting_user: &str,
        scopes: &[S],
    ) -> Result<JwtAssertion> {
        if target.is_empty() {
            return Err(Error::validation("target identity"));
        }
        if acting_user.is_empty() {
            return Err(Error::validation("acting user"));
        }
        let scope = canonical_scopes(scopes).join(" ");
        if scope.is_empty() {
            return Err(Error::validation("scopes"));
        }

        let now = OffsetDateTime::now_utc();
        Ok(JwtAssertion {
            iss: target.to_string(),
            sub: acting_user.to_string(),
            scope,
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;

    const TARGET: &str = "robot@my-project.iam.gserviceaccount.com";
    const USER: &str = "user@example.com";

    #[test_case("", USER, &["scope"], "target identity"; "empty target")]
    #[test_case(TARGET, "", &["scope"], "acting user"; "empty user")]
    #[test_case(TARGET, USER, &[], "scopes"; "no scopes")]
    #[test_case(TARGET, USER, &["", ""], "scopes"; "only empty scopes")]
    fn validation(target: &str, user: &str, scopes: &[&str], field: &str) {
        let err = AssertionBuilder::new()
            .build(target, user, scopes)
            .unwrap_err();
        assert!(err.is_validation(), "{err:?}");
        assert!(err.to_string().contains(field), "{err}");
    }

    #[test]
    fn claims() -> TestResult {
        let before = OffsetDateTime::now_utc().unix_timestamp();
        let assertion = AssertionBuilder::new().build(
            TARGET,
            USER,
            &[
                "https://www.googleapis.com/auth/gmail.readonly",
                "",
                "https://www.googleapis.com/auth/admin.directory.user",
            ],
        )?;
        let after = OffsetDateTime::now_utc().unix_timestamp();

        assert_eq!(assertion.iss, TARGET);
        assert_eq!(assertion.sub, USER);
        assert_eq!(
            assertion.scope,
            "https://www.googleapis.com/auth/admin.directory.user https://www.googleapis.com/auth/gmail.readonly"
        );
        assert_eq!(assertion.aud, DEFAULT_TOKEN_URL);
        let iat = assertion.iat.unix_timestamp();
        assert!(before <= iat && iat <= after, "{assertion:?}");
        assert_eq!(assertion.exp - assertion.iat, DEFAULT_LIFETIME);
        Ok(())
    }

    #[test]
    fn overrides() -> TestResult {
        let builder = AssertionBuilder::new()
            .with_audience("https://token.example.com")
            .with_lifetime(Duration::from_secs(600));
        assert_eq!(builder.lifetime(), Duration::from_secs(600));

        let assertion = builder.build(TARGET, USER, &["scope"])?;
        assert_eq!(assertion.aud, "https://token.example.com");
        assert_eq!(assertion.exp - assertion.iat, Duration::from_secs(600));
        Ok(())
    }

    #[test]
    fn payload() -> TestResult {
        let assertion = AssertionBuilder::new().build(TARGET, USER, &["b", "a", "b"])?;
        let got = serde_json::from_str::<serde_json::Value>(&assertion.payload()?)?;
        let want = json!({
            "iss": TARGET,
            "sub": USER,
            "scope": "a b",
            "aud": DEFAULT_TOKEN_URL,
            "iat": assertion.iat.unix_timestamp(),
            "exp": assertion.exp.unix_timestamp(),
        });
        assert_eq!(got, want);
        Ok(())
    }
}
