//! Access token source
//!
//! Sign-in happens outside this server: an external tool writes the bearer
//! token to a JSON file (`{"token": "...", "expiresAt": "2025-01-01T00:00:00Z"}`).
//! [`TokenStore`] reads and caches it and refuses tokens that are missing or
//! about to expire.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token file {path} could not be read: {source}")]
    TokenFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Token parse error: {0}")]
    ParseError(String),

    #[error("Not authenticated: token is empty or missing")]
    MissingToken,

    #[error("Token expired at {0}; sign in again")]
    Expired(DateTime<Utc>),

    #[error("Token rejected by Microsoft Graph: {0}")]
    Rejected(String),
}

/// Token file contents
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAuthInfo {
    #[serde(default)]
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Cached token with expiry tracking
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        // Consider token expired 60 seconds before actual expiry
        match self.expires_at {
            Some(expires_at) => expires_at > Utc::now() + Duration::seconds(60),
            None => true,
        }
    }
}

/// Bearer token source for Graph requests
#[derive(Debug)]
pub struct TokenStore {
    token_path: Option<PathBuf>,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenStore {
    /// Token store backed by the file at `token_path`
    pub fn new(token_path: PathBuf) -> Self {
        Self {
            token_path: Some(token_path),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Token store holding a fixed, non-expiring token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token_path: None,
            token_cache: Arc::new(RwLock::new(Some(CachedToken {
                access_token: token.into(),
                expires_at: None,
            }))),
        }
    }

    pub fn token_path(&self) -> Option<&Path> {
        self.token_path.as_deref()
    }

    /// Return the cached token, reloading the token file when the cache is
    /// empty or stale.
    pub async fn get_token(&self) -> Result<String, AuthError> {
        // Check cache first
        {
            let cache = self.token_cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_valid() {
                    tracing::debug!("Using cached token");
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let path = self.token_path.as_deref().ok_or(AuthError::MissingToken)?;
        tracing::info!("Loading access token from {}", path.display());
        let cached = load_token(path).await?;

        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(cached.clone());
        }

        Ok(cached.access_token)
    }

    /// Clear the token cache
    pub async fn clear_cache(&self) {
        let mut cache = self.token_cache.write().await;
        *cache = None;
    }
}

async fn load_token(path: &Path) -> Result<CachedToken, AuthError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AuthError::TokenFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let stored: StoredAuthInfo = serde_json::from_str(&raw)
        .map_err(|e| AuthError::ParseError(format!("Failed to parse token file: {}", e)))?;

    if stored.token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }

    let cached = CachedToken {
        access_token: stored.token,
        expires_at: stored.expires_at,
    };

    if !cached.is_valid() {
        if let Some(expires_at) = cached.expires_at {
            return Err(AuthError::Expired(expires_at));
        }
    }

    Ok(cached)
}
