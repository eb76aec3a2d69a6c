//! In-process stand-ins for the external services.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use spotsync::audio::{AudioFetchError, AudioFetcher, AudioProbe, ProbeError};
use spotsync::blob_store::{BlobUploader, UploadedAsset};
use spotsync::pipeline::CatalogId;
use spotsync::spotify::{
    MetadataProvider, PlaylistItem, PlaylistTrackRef, PlaylistTracksPage, SpotifyAlbum,
    SpotifyArtist, SpotifyImage, SpotifyPlaylist, SpotifyTrack,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::constants::*;

fn image(url: &str) -> SpotifyImage {
    SpotifyImage {
        url: url.to_string(),
        width: Some(640),
        height: Some(640),
    }
}

pub fn artist(id: &str, name: &str) -> SpotifyArtist {
    SpotifyArtist {
        id: Some(id.to_string()),
        name: name.to_string(),
        images: vec![image(&format!("https://img.test/{}.jpg", id))],
    }
}

pub fn track(id: &str, name: &str, artists: Vec<SpotifyArtist>) -> SpotifyTrack {
    SpotifyTrack {
        id: Some(id.to_string()),
        name: name.to_string(),
        artists,
        album: Some(SpotifyAlbum {
            images: vec![image(ALBUM_ARTWORK_URL)],
        }),
    }
}

fn page(ids: &[Option<&str>], next: Option<&str>) -> PlaylistTracksPage {
    PlaylistTracksPage {
        items: ids
            .iter()
            .map(|id| PlaylistItem {
                track: id.map(|id| PlaylistTrackRef {
                    id: Some(id.to_string()),
                }),
            })
            .collect(),
        next: next.map(String::from),
    }
}

// ============================================================================
// Metadata
// ============================================================================

pub struct FakeMetadata {
    tracks: HashMap<String, SpotifyTrack>,
    playlists: HashMap<String, SpotifyPlaylist>,
    pages: HashMap<String, PlaylistTracksPage>,
    failures_left: AtomicUsize,
    pub track_calls: AtomicUsize,
}

impl FakeMetadata {
    /// Five tracks by two artists, one artist-less track and a two-page playlist.
    pub fn with_fixtures() -> Self {
        let band = artist(ARTIST_1_ID, ARTIST_1_NAME);
        let jazz = artist(ARTIST_2_ID, ARTIST_2_NAME);
        let tracks = [
            track(TRACK_1_ID, TRACK_1_TITLE, vec![band.clone()]),
            track(TRACK_2_ID, TRACK_2_TITLE, vec![band.clone(), jazz.clone()]),
            track(TRACK_3_ID, TRACK_3_TITLE, vec![band]),
            track(TRACK_4_ID, TRACK_4_TITLE, vec![jazz.clone()]),
            track(TRACK_5_ID, TRACK_5_TITLE, vec![jazz]),
            track(ORPHAN_TRACK_ID, ORPHAN_TRACK_TITLE, Vec::new()),
        ];

        // First page carries a removed entry and a local file id
        let playlist = SpotifyPlaylist {
            id: Some(PLAYLIST_ID.to_string()),
            name: PLAYLIST_NAME.to_string(),
            tracks: page(
                &[Some(TRACK_1_ID), None, Some(TRACK_2_ID), Some("local-file")],
                Some(PLAYLIST_PAGE_2_URL),
            ),
        };
        let second_page = page(&[Some(TRACK_3_ID), Some(TRACK_1_ID)], None);

        Self {
            tracks: tracks
                .into_iter()
                .map(|t| (t.id.clone().unwrap_or_default(), t))
                .collect(),
            playlists: HashMap::from([(PLAYLIST_ID.to_string(), playlist)]),
            pages: HashMap::from([(PLAYLIST_PAGE_2_URL.to_string(), second_page)]),
            failures_left: AtomicUsize::new(0),
            track_calls: AtomicUsize::new(0),
        }
    }

    /// The next `count` track fetches fail with a transient error.
    pub fn fail_next_fetches(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn track_calls(&self) -> usize {
        self.track_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeMetadata {
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    async fn fetch_track(&self, id: &CatalogId) -> Result<SpotifyTrack> {
        self.track_calls.fetch_add(1, Ordering::SeqCst);
        let transient = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if transient {
            return Err(anyhow!("Spotify API request failed: 503 Service Unavailable"));
        }
        self.tracks
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Spotify API request failed: 404 Not Found"))
    }

    async fn fetch_playlist(&self, id: &CatalogId) -> Result<SpotifyPlaylist> {
        self.playlists
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("Spotify API request failed: 404 Not Found"))
    }

    async fn fetch_playlist_page(&self, next_url: &str) -> Result<PlaylistTracksPage> {
        self.pages
            .get(next_url)
            .cloned()
            .ok_or_else(|| anyhow!("unknown page {}", next_url))
    }
}

// ============================================================================
// Audio
// ============================================================================

/// Writes a small file where yt-dlp would put the audio.
#[derive(Default)]
pub struct FakeAudio {
    failing_queries: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl FakeAudio {
    /// Every fetch whose query contains `title` fails.
    pub fn fail_for(&self, title: &str) {
        if let Ok(mut failing) = self.failing_queries.lock() {
            failing.insert(title.to_string());
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioFetcher for FakeAudio {
    async fn fetch(&self, query: &str, destination_template: &Path) -> Result<(), AudioFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_queries
            .lock()
            .map(|failing| failing.iter().any(|title| query.contains(title.as_str())))
            .unwrap_or(false);
        if failing {
            return Err(AudioFetchError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: "ERROR: no results".to_string(),
            });
        }

        let target = destination_template
            .to_string_lossy()
            .replace("%(ext)s", "m4a");
        tokio::fs::write(target, b"fake audio").await?;
        Ok(())
    }
}

// ============================================================================
// Blob store
// ============================================================================

#[derive(Default)]
pub struct FakeUploader {
    failing_names: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl FakeUploader {
    /// Every upload whose file name contains `name` fails.
    pub fn fail_for(&self, name: &str) {
        if let Ok(mut failing) = self.failing_names.lock() {
            failing.insert(name.to_string());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failing) = self.failing_names.lock() {
            failing.clear();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobUploader for FakeUploader {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow!("no file name in {:?}", local_path))?;
        let failing = self
            .failing_names
            .lock()
            .map(|failing| failing.iter().any(|n| name.contains(n.as_str())))
            .unwrap_or(false);
        if failing {
            return Err(anyhow!("Cloudinary upload failed: 502 Bad Gateway"));
        }
        Ok(UploadedAsset {
            secure_url: format!("https://cdn.test/{}", name),
        })
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Returns a fixed duration, or fails when none is set.
pub struct FakeProbe {
    pub duration: Option<f64>,
}

#[async_trait]
impl AudioProbe for FakeProbe {
    async fn duration_seconds(&self, _path: &Path) -> Result<f64, ProbeError> {
        self.duration
            .ok_or_else(|| ProbeError::ProbeFailed("moov atom not found".to_string()))
    }
}
