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

#[cfg(test)]
mod tests {
    use delegated_auth::factory::{Builder, ClientFactory};
    use delegated_auth::signer::{SigningError, SigningProvider};
    use delegated_auth::{Context, TokenCache};
    use delegated_logging::CloudLoggingLayer;
    use delegated_services::{ServiceClient, handle_error};
    use http::StatusCode;
    use httptest::matchers::{all_of, contains, request, url_decoded};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server};
    use serde_json::{Value, json};
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;

    type TestResult = anyhow::Result<()>;

    const TARGET: &str = "robot@my-project.iam.gserviceaccount.com";
    const USER: &str = "user@example.com";
    const SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/admin.directory.user.readonly"];

    mockall::mock! {
        #[derive(Debug)]
        SigningService {}

        #[async_trait::async_trait]
        impl SigningProvider for SigningService {
            async fn sign_jwt(&self, name: &str, payload: &str) -> delegated_auth::signer::Result<String>;
        }
    }

    fn factory(signer: MockSigningService, server: &Server) -> ClientFactory {
        Builder::new(signer, Arc::new(TokenCache::new()))
            .with_token_url(server.url("/token").to_string())
            .build()
    }

    #[tokio::test]
    async fn get_with_delegated_token() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/token"),
                request::body(url_decoded(contains(("assertion", "mocked_signed_jwt")))),
            ])
            .times(1)
            .respond_with(json_encoded(json!({
                "access_token": "mocked_access_token",
                "expires_in": 3600,
            }))),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/admin/directory/v1/users"),
                request::headers(contains(("authorization", "Bearer mocked_access_token"))),
                request::query(url_decoded(contains(("customer", "my_customer")))),
            ])
            .times(2)
            .respond_with(json_encoded(json!({"users": [{"primaryEmail": USER}]}))),
        );

        let mut signer = MockSigningService::new();
        signer
            .expect_sign_jwt()
            .times(1)
            .returning(|_, _| Ok("mocked_signed_jwt".to_string()));
        let factory = factory(signer, &server);
        let ctx = Context::background();

        for _ in 0..2 {
            let client = ServiceClient::new(
                &ctx,
                &factory,
                TARGET,
                USER,
                &SCOPES,
                &server.url_str("/admin/directory/v1"),
            )
            .await?;
            let body = client
                .get(&ctx, "users", &[("customer", "my_customer")])
                .await?;
            let got = serde_json::from_slice::<Value>(&body)?;
            assert_eq!(got["users"][0]["primaryEmail"], USER);
        }
        Ok(())
    }

    #[tokio::test]
    async fn unknown_target() -> TestResult {
        let server = Server::run();
        let mut signer = MockSigningService::new();
        signer.expect_sign_jwt().returning(|_, _| {
            Err(SigningError::api(
                StatusCode::BAD_REQUEST,
                format!("Gaia id not found for email {TARGET}"),
            ))
        });
        let factory = factory(signer, &server);

        let err = ServiceClient::new(
            &Context::background(),
            &factory,
            TARGET,
            USER,
            &SCOPES,
            "https://admin.googleapis.com",
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), Some("1000"));
        assert_eq!(
            err.error_message(),
            Some(format!("Gaia ID not found for email {TARGET}").as_str())
        );
        assert!(err.body().starts_with("Gaia ID not found for email"), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn other_failures_are_internal() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/token"))
                .respond_with(status_code(400).body("invalid_grant")),
        );
        let mut signer = MockSigningService::new();
        signer
            .expect_sign_jwt()
            .returning(|_, _| Ok("mocked_signed_jwt".to_string()));
        let factory = factory(signer, &server);

        let err = ServiceClient::new(
            &Context::background(),
            &factory,
            TARGET,
            USER,
            &SCOPES,
            "https://admin.googleapis.com",
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), None);
        assert!(
            err.body().starts_with("Error generating HTTP client:"),
            "{err:?}"
        );
        Ok(())
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Buffer {
        fn entries(&self) -> Vec<Value> {
            let contents = self.0.lock().unwrap();
            String::from_utf8_lossy(&contents)
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[tokio::test]
    async fn error_response_hides_details() -> TestResult {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/v1/users"))
                .respond_with(status_code(403).body("caller lacks permission on project 123")),
        );
        let client = ServiceClient::from_client(reqwest::Client::new(), server.url_str("/v1"));
        let err = client
            .get::<&str, &str>(&Context::background(), "users", &[])
            .await
            .unwrap_err();

        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with(CloudLoggingLayer::new().with_writer(buffer.clone()));
        let response = tracing::subscriber::with_default(subscriber, || handle_error(&err));

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(!response.body().contains("project 123"), "{response:?}");

        let entries = buffer.entries();
        let error = entries
            .iter()
            .find(|e| e["severity"] == "ERROR")
            .expect("an ERROR entry");
        assert_eq!(error["status_code"], 403);
        let debug = entries
            .iter()
            .find(|e| e["severity"] == "DEBUG")
            .expect("a DEBUG entry");
        assert_eq!(debug["body"], "caller lacks permission on project 123");
        Ok(())
    }
}
