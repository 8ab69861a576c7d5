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

//! Delegated service-account credentials.
//!
//! This crate turns a long-lived service account identity into short-lived,
//! cacheable bearer tokens issued on behalf of a user ([domain-wide
//! delegation]). The flow has two network steps:
//!
//! 1. A JWT assertion naming the service account (`iss`), the acting user
//!    (`sub`) and the requested scopes is signed by the IAM Credentials
//!    service on behalf of the service account.
//! 2. The signed assertion is exchanged at the OAuth2 token endpoint using the
//!    [JWT bearer grant].
//!
//! The resulting token is stored in a [TokenCache], owned by the application,
//! and handed out as a [reqwest::Client] that attaches the token to every
//! request.
//!
//! ```no_run
//! # use delegated_auth::{Context, TokenCache, factory, signer::IamSigner};
//! # use std::sync::Arc;
//! # tokio_test::block_on(async {
//! let cache = Arc::new(TokenCache::new());
//! let factory = factory::Builder::new(IamSigner::new(), cache).build();
//! let ctx = Context::background().with_timeout(std::time::Duration::from_secs(30));
//! let client = factory
//!     .get_client(
//!         &ctx,
//!         "robot@my-project.iam.gserviceaccount.com",
//!         "user@example.com",
//!         &["https://www.googleapis.com/auth/admin.directory.user.readonly"],
//!         None,
//!     )
//!     .await?;
//! let response = client
//!     .get("https://admin.googleapis.com/admin/directory/v1/users?customer=my_customer")
//!     .send()
//!     .await?;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [domain-wide delegation]: https://developers.google.com/identity/protocols/oauth2/service-account#delegatingauthority
//! [JWT bearer grant]: https://datatracker.ietf.org/doc/html/rfc7523

pub mod assertion;
pub mod errors;
pub mod exchange;
pub mod factory;
pub mod signer;

/// Types to work with cached bearer tokens.
pub mod token;

/// The cache of delegated tokens.
pub mod token_cache;

mod constants;
mod context;

pub use context::{Context, Interrupted};
pub use errors::Error;
pub use token::Token;
pub use token_cache::TokenCache;

/// A `Result` alias where the `Err` case is `delegated_auth::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
