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

use crate::token::Token;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Identifies a cache entry.
///
/// The key is derived from an identity and a set of scopes. Scopes are
/// canonicalized (sorted, duplicates and empty strings removed) before
/// hashing, so the order in which callers list them does not matter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new<S: AsRef<str>>(identity: &str, scopes: &[S]) -> Self {
        let mut hasher = Sha256::new();
        // Length prefixes keep ("ab", ["c"]) and ("a", ["bc"]) apart.
        let mut field = |value: &str| {
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value.as_bytes());
        };
        field(identity);
        for scope in canonical_scopes(scopes) {
            field(scope);
        }
        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sorts and de-duplicates `scopes`, dropping empty strings.
pub(crate) fn canonical_scopes<S: AsRef<str>>(scopes: &[S]) -> Vec<&str> {
    let mut scopes = scopes
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();
    scopes.sort_unstable();
    scopes.dedup();
    scopes
}

/// A thread-safe cache of delegated tokens.
///
/// Entries are evicted lazily: an expired token is removed by the
/// [get_token][TokenCache::get_token] call that finds it. Callers never
/// observe an expired token.
///
/// The cache is meant to be created once by the application and shared, for
/// example as an `Arc<TokenCache>`, with every
/// [ClientFactory][crate::factory::ClientFactory] that should reuse tokens.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: Mutex<HashMap<CacheKey, Token>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token stored for `identity` and `scopes`, if it is still
    /// valid.
    pub fn get_token<S: AsRef<str>>(&self, identity: &str, scopes: &[S]) -> Option<Token> {
        let key = CacheKey::new(identity, scopes);
        let mut tokens = self.lock();
        match tokens.get(&key) {
            None => None,
            Some(token) if token.is_expired() => {
                tokens.remove(&key);
                tracing::debug!(key = key.as_str(), "evicted expired token");
                None
            }
            Some(token) => Some(token.clone()),
        }
    }

    /// Stores `token` for `identity` and `scopes`, replacing any previous
    /// entry.
    pub fn set_token<S: AsRef<str>>(&self, identity: &str, scopes: &[S], token: Token) {
        let key = CacheKey::new(identity, scopes);
        self.lock().insert(key, token);
    }

    /// The number of entries, including expired entries not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Each critical section is a single map operation, so the map is
    // consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Token>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
