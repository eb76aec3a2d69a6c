//! Models for the Spotify Web API responses.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! payload is ignored.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpotifyImage {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpotifyArtist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

impl SpotifyArtist {
    pub fn artwork_url(&self) -> String {
        first_image_url(&self.images)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
}

impl SpotifyTrack {
    /// URL of the first album image, or empty.
    pub fn artwork_url(&self) -> String {
        self.album
            .as_ref()
            .map(|album| first_image_url(&album.images))
            .unwrap_or_default()
    }

    pub fn primary_artist_name(&self) -> &str {
        self.artists
            .first()
            .map(|artist| artist.name.as_str())
            .unwrap_or("Unknown Artist")
    }
}

/// Track reference inside a playlist item.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlaylistTrackRef {
    pub id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlaylistItem {
    /// Null for removed or unavailable tracks.
    pub track: Option<PlaylistTrackRef>,
}

/// One page of playlist members.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PlaylistTracksPage {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    /// URL of the next page, if any.
    pub next: Option<String>,
}

impl PlaylistTracksPage {
    /// Member track ids on this page, skipping removed entries.
    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter_map(|item| item.track.as_ref())
            .filter_map(|track| track.id.as_deref())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SpotifyPlaylist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub tracks: PlaylistTracksPage,
}

/// Response of the client-credentials token endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

fn first_image_url(images: &[SpotifyImage]) -> String {
    images
        .first()
        .map(|image| image.url.clone())
        .unwrap_or_default()
}
