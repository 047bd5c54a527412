//! Client-credentials access token provider
//!
//! Holds a single process-wide token with its expiry. The check-and-refresh
//! runs inside one critical section, so concurrent callers arriving while
//! the token is expired trigger exactly one exchange.

use super::AdapterError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Spotify accounts token endpoint
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Lazily refreshed OAuth2 client-credentials token
pub struct TokenProvider {
    http_client: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http_client: Client, client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            http_client,
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Current token, exchanging credentials only when absent or expired
    pub async fn access_token(&self) -> Result<String, AdapterError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!("Access token expired, refreshing");
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Forget the cached token (after the API rejected it)
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self) -> Result<CachedToken, AdapterError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(AdapterError::Auth(
                    "Spotify client credentials not configured".to_string(),
                ))
            }
        };

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AdapterError::Auth(format!("Token exchange request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdapterError::Auth(format!(
                "Token exchange returned {}: {}",
                status, body
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Auth(format!("Malformed token response: {}", e)))?;

        info!(expires_in = body.expires_in, "Obtained Spotify access token");

        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}
