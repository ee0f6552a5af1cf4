// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory store of valid access tokens.
//!
//! Membership is the only validity predicate: tokens carry no expiry or
//! scope. The store grows for the life of the process unless a capacity is
//! configured, in which case the least recently used non-seed token is
//! evicted to make room.

use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Random bytes per token (hex encoded to 64 characters).
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug)]
struct TokenEntry {
    /// Seed tokens are never evicted
    pinned: bool,
    /// Logical time of last successful lookup
    last_used: AtomicU64,
}

/// Thread-safe token set.
#[derive(Debug)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenEntry>>,
    capacity: Option<usize>,
    tick: AtomicU64,
}

/// Generate a fresh random token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl TokenStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a store holding at most `capacity` unpinned tokens beyond the
    /// seeds, or unbounded for `None`.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
            capacity,
            tick: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    /// Add a pinned token that is valid for the life of the process.
    pub async fn insert_seed(&self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        let entry = TokenEntry {
            pinned: true,
            last_used: AtomicU64::new(self.next_tick()),
        };
        self.tokens.write().await.insert(token, entry);
    }

    /// Generate, store and return a new token.
    pub async fn issue(&self) -> String {
        let token = generate_token();
        let entry = TokenEntry {
            pinned: false,
            last_used: AtomicU64::new(self.next_tick()),
        };

        let mut tokens = self.tokens.write().await;
        if let Some(capacity) = self.capacity {
            while tokens.values().filter(|e| !e.pinned).count() >= capacity.max(1) {
                let Some(victim) = tokens
                    .iter()
                    .filter(|(_, e)| !e.pinned)
                    .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                    .map(|(t, _)| t.clone())
                else {
                    break;
                };
                debug!(evicted = %redact(&victim), "Token store at capacity, evicting least recently used");
                tokens.remove(&victim);
            }
        }
        tokens.insert(token.clone(), entry);
        token
    }

    /// Whether `token` is currently valid. Empty tokens never are.
    pub async fn is_valid(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let tokens = self.tokens.read().await;
        match tokens.get(token) {
            Some(entry) => {
                entry.last_used.store(self.next_tick(), Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Remove a token. Returns whether it was present.
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorten a token for log output.
pub fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}
