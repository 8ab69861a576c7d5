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

//! Sign JWT assertions on behalf of a service account.
//!
//! The [ClientFactory][crate::factory::ClientFactory] never holds private
//! keys. It asks a [SigningProvider] to sign the assertion on behalf of the
//! target service account. [IamSigner] is the production implementation,
//! backed by the IAM Credentials API. Tests typically provide their own
//! implementation.

use http::StatusCode;
use std::sync::Arc;

mod iam;
mod mds;

pub use iam::IamSigner;
pub use mds::{MetadataTokenProvider, SourceToken, SourceTokenProvider};

pub type Result<T> = std::result::Result<T, SigningError>;

/// Formats the resource name of a service account.
pub fn service_account_name(email: &str) -> String {
    format!("projects/-/serviceAccounts/{email}")
}

/// Signs JWT claim sets on behalf of a service account.
#[async_trait::async_trait]
pub trait SigningProvider: Send + Sync + std::fmt::Debug {
    /// Signs `payload`, a JSON claim set, as the service account `name`.
    ///
    /// The `name` is a resource name in the form
    /// `projects/-/serviceAccounts/{email}`. Returns the signed JWT in its
    /// compact serialization.
    async fn sign_jwt(&self, name: &str, payload: &str) -> Result<String>;
}

/// A cheap-to-clone handle to a [SigningProvider].
#[derive(Clone, Debug)]
pub struct Signer {
    pub(crate) inner: Arc<dyn SigningProvider>,
}

impl<T> std::convert::From<T> for Signer
where
    T: SigningProvider + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl Signer {
    pub async fn sign_jwt(&self, name: &str, payload: &str) -> Result<String> {
        self.inner.sign_jwt(name, payload).await
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for [SigningProvider] implementations.
///
/// The constructors are public so applications can create errors when
/// testing with their own [SigningProvider].
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct SigningError(SigningErrorKind);

impl SigningError {
    /// A problem reaching the signing service.
    pub fn is_transport(&self) -> bool {
        matches!(self.0, SigningErrorKind::Transport(_))
    }

    /// A problem parsing the signing service response.
    pub fn is_parsing(&self) -> bool {
        matches!(self.0, SigningErrorKind::Parsing(_))
    }

    /// The signing service rejected the request.
    pub fn is_api(&self) -> bool {
        matches!(self.0, SigningErrorKind::Api { .. })
    }

    /// The HTTP status returned by the signing service, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match &self.0 {
            SigningErrorKind::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The response body returned by the signing service, if any.
    pub fn body(&self) -> Option<&str> {
        match &self.0 {
            SigningErrorKind::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Returns true if the signing service does not know the service account.
    pub fn is_identity_not_found(&self) -> bool {
        if self.status() == Some(StatusCode::NOT_FOUND) {
            return true;
        }
        let message = match &self.0 {
            SigningErrorKind::Api { body, .. } => body.clone(),
            other => other.to_string(),
        };
        message
            .to_ascii_lowercase()
            .contains(&crate::constants::IDENTITY_NOT_FOUND_MSG.to_ascii_lowercase())
    }

    /// A problem reaching the signing service.
    pub fn transport<T>(source: T) -> SigningError
    where
        T: Into<BoxError>,
    {
        SigningError(SigningErrorKind::Transport(source.into()))
    }

    /// A problem parsing the signing service response.
    pub fn parsing<T>(source: T) -> SigningError
    where
        T: Into<BoxError>,
    {
        SigningError(SigningErrorKind::Parsing(source.into()))
    }

    /// The signing service returned an unsuccessful HTTP status.
    pub fn api<T: Into<String>>(status: StatusCode, body: T) -> SigningError {
        SigningError(SigningErrorKind::Api {
            status,
            body: body.into(),
        })
    }
}

#[derive(thiserror::Error, Debug)]
enum SigningErrorKind {
    #[error("failed to sign JWT via IAM API: {0}")]
    Transport(#[source] BoxError),
    #[error("failed to parse signing response: {0}")]
    Parsing(#[source] BoxError),
    #[error("signing service returned {status}")]
    Api { status: StatusCode, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[derive(Debug)]
    struct Fixed;

    #[async_trait::async_trait]
    impl SigningProvider for Fixed {
        async fn sign_jwt(&self, name: &str, payload: &str) -> Result<String> {
            Ok(format!("{name}|{payload}"))
        }
    }

    #[tokio::test]
    async fn signer_from_provider() -> anyhow::Result<()> {
        let signer = Signer::from(Fixed);
        let clone = signer.clone();
        assert_eq!(clone.sign_jwt("name", "payload").await?, "name|payload");
        Ok(())
    }

    #[test]
    fn resource_name() {
        assert_eq!(
            service_account_name("robot@example.com"),
            "projects/-/serviceAccounts/robot@example.com"
        );
    }

    #[test]
    fn constructors() {
        let error = SigningError::transport("test message");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = SigningError::parsing("test message");
        assert!(error.is_parsing(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = SigningError::api(StatusCode::FORBIDDEN, "denied");
        assert!(error.is_api(), "{error:?}");
        assert_eq!(error.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(error.body(), Some("denied"));
        assert!(!error.to_string().contains("denied"), "{error}");
    }

    #[test_case(SigningError::api(StatusCode::NOT_FOUND, "gone"); "status")]
    #[test_case(SigningError::api(StatusCode::BAD_REQUEST, "Gaia id not found for email robot@example.com"); "body")]
    #[test_case(SigningError::transport("Gaia id not found for email robot@example.com"); "message")]
    #[test_case(SigningError::transport("GAIA ID NOT FOUND FOR EMAIL robot@example.com"); "case insensitive")]
    fn identity_not_found(error: SigningError) {
        assert!(error.is_identity_not_found(), "{error:?}");
    }

    #[test_case(SigningError::api(StatusCode::FORBIDDEN, "permission denied"); "forbidden")]
    #[test_case(SigningError::transport("connection refused"); "transport")]
    #[test_case(SigningError::parsing("expected value"); "parsing")]
    fn identity_found(error: SigningError) {
        assert!(!error.is_identity_not_found(), "{error:?}");
    }
}
