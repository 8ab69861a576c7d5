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

use crate::constants::MAX_TOKEN_LIFETIME;
use std::time::Duration;
use tokio::time::Instant;

/// A bearer token and the instant it stops being valid.
#[derive(Clone, PartialEq)]
pub struct Token {
    /// The actual token string.
    ///
    /// This is the value used in the `Authorization:` header.
    pub token: String,

    /// The instant at which the token expires.
    ///
    /// Note that the `Instant` is not valid across processes. Let the
    /// [TokenCache][crate::TokenCache] track expirations within a process
    /// instead of handling them yourself.
    pub expires_at: Instant,
}

impl Token {
    /// Creates a token that expires `lifetime` from now.
    ///
    /// Lifetimes longer than seven days are shortened to seven days.
    pub fn new<S: Into<String>>(token: S, lifetime: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: Instant::now() + lifetime.min(MAX_TOKEN_LIFETIME),
        }
    }

    /// Returns true if the token is no longer valid.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token", &"[censored]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
