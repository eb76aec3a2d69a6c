//! HTTP client for the Spotify Web API using the client-credentials flow.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::models::{PlaylistTracksPage, SpotifyPlaylist, SpotifyTrack, TokenResponse};
use super::MetadataProvider;
use crate::config::SpotifyCredentials;
use crate::pipeline::CatalogId;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh the token this long before it actually expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: reqwest::Client,
    api_base: String,
    token_url: String,
    credentials: SpotifyCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials, timeout: Duration) -> Result<Self> {
        Self::with_endpoints(
            credentials,
            timeout,
            DEFAULT_API_BASE.to_string(),
            DEFAULT_TOKEN_URL.to_string(),
        )
    }

    /// Create a client talking to custom endpoints.
    pub fn with_endpoints(
        credentials: SpotifyCredentials,
        timeout: Duration,
        api_base: String,
        token_url: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // Ensure api_base doesn't have trailing slash
        let api_base = api_base.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            api_base,
            token_url,
            credentials,
            token: Mutex::new(None),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Current access token, fetching a new one if missing or about to expire.
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(cached) = token.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < cached.expires_at {
                return Ok(cached.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Failed to connect to Spotify accounts service")?;

        if !response.status().is_success() {
            bail!(
                "Spotify authentication failed with status: {}",
                response.status()
            );
        }

        let body: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        let value = body.access_token.clone();
        *token = Some(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} from Spotify", what))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                // Next attempt fetches a fresh token
                self.invalidate_token().await;
                bail!("Spotify rejected the access token fetching {}", what);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown")
                    .to_string();
                bail!(
                    "Spotify rate limit hit fetching {} (retry after {}s)",
                    what,
                    retry_after
                );
            }
            status => bail!("Failed to fetch {}: status {}", what, status),
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }
}

#[async_trait]
impl MetadataProvider for SpotifyClient {
    async fn authenticate(&self) -> Result<()> {
        self.invalidate_token().await;
        self.access_token().await?;
        info!("Authenticated with Spotify");
        Ok(())
    }

    async fn fetch_track(&self, id: &CatalogId) -> Result<SpotifyTrack> {
        let url = format!("{}/tracks/{}", self.api_base, id);
        self.get_json(&url, &format!("track {}", id)).await
    }

    async fn fetch_playlist(&self, id: &CatalogId) -> Result<SpotifyPlaylist> {
        let url = format!("{}/playlists/{}", self.api_base, id);
        self.get_json(&url, &format!("playlist {}", id)).await
    }

    async fn fetch_playlist_page(&self, next_url: &str) -> Result<PlaylistTracksPage> {
        self.get_json(next_url, "playlist page").await
    }
}
