//! Process-wide bearer token cache.
//!
//! Readers share the current token under a read lock. When it is missing or
//! about to expire, one caller takes the refresh lock and fetches a new one;
//! everyone queued behind it picks up the fresh token instead of refreshing
//! again.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use plyt_core::PlytResult;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Tokens are treated as expired this long before their real deadline.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub secret: String,
    /// `None` for tokens that never expire on our side.
    pub expires_at: Option<SystemTime>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: expires_in.map(|ttl| SystemTime::now() + ttl),
        }
    }

    pub fn is_fresh_at(&self, now: SystemTime) -> bool {
        match self.expires_at {
            Some(deadline) => now + EXPIRY_SKEW < deadline,
            None => true,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(SystemTime::now())
    }
}

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> PlytResult<AccessToken>;
}

/// Hands out the same token forever. Used for pre-issued access tokens.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenRefresher for StaticToken {
    async fn refresh(&self) -> PlytResult<AccessToken> {
        Ok(AccessToken::new(self.0.clone(), None))
    }
}

pub struct TokenCache {
    name: &'static str,
    refresher: Box<dyn TokenRefresher>,
    current: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenCache {
    pub fn new(name: &'static str, refresher: impl TokenRefresher + 'static) -> Self {
        Self {
            name,
            refresher: Box::new(refresher),
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Starts from a token obtained elsewhere, e.g. one read from disk.
    pub fn with_token(mut self, token: AccessToken) -> Self {
        self.current = RwLock::new(Some(token));
        self
    }

    /// Current token secret, refreshing first if needed.
    pub async fn access_token(&self) -> PlytResult<String> {
        if let Some(secret) = self.fresh_secret().await {
            return Ok(secret);
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        if let Some(secret) = self.fresh_secret().await {
            return Ok(secret);
        }

        debug!(cache = self.name, "refreshing access token");
        let token = self.refresher.refresh().await?;
        let secret = token.secret.clone();
        *self.current.write().await = Some(token);
        info!(cache = self.name, "access token refreshed");
        Ok(secret)
    }

    /// Drops `rejected` so the next call refreshes. A token that has already
    /// been replaced is left alone.
    pub async fn invalidate(&self, rejected: &str) {
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|token| token.secret == rejected) {
            debug!(cache = self.name, "access token invalidated");
            *current = None;
        }
    }

    async fn fresh_secret(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.secret.clone())
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
