//! Music metadata provider.

mod client;
mod models;

pub use client::SpotifyClient;
pub use models::*;

use anyhow::Result;
use async_trait::async_trait;

use crate::pipeline::CatalogId;

/// Source of authoritative track and playlist metadata.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Obtain (or refresh) credentials. Called once at startup.
    async fn authenticate(&self) -> Result<()>;

    async fn fetch_track(&self, id: &CatalogId) -> Result<SpotifyTrack>;

    /// Fetch a playlist with its first page of members.
    async fn fetch_playlist(&self, id: &CatalogId) -> Result<SpotifyPlaylist>;

    /// Fetch a follow-up page of playlist members from a `next` URL.
    async fn fetch_playlist_page(&self, next_url: &str) -> Result<PlaylistTracksPage>;
}
