//! Records persisted in the catalog database.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub external_artist_id: Option<String>,
    pub artwork_url: String,
    pub is_featured: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub song_ids: BTreeSet<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub id: String,
    pub title: String,
    pub artist_ids: BTreeSet<String>,
    pub duration_seconds: f64,
    pub file_url: String,
    pub artwork_url: String,
    pub is_featured: bool,
    pub external_track_id: String,
    pub created_at: i64,
}

/// Artist data as it arrives from the metadata provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArtist {
    pub name: String,
    pub external_artist_id: Option<String>,
    pub artwork_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub artist_ids: Vec<String>,
    pub duration_seconds: f64,
    pub file_url: String,
    pub artwork_url: String,
    pub external_track_id: String,
}

/// Result of an insert-if-absent on songs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongInsert {
    Inserted(String),
    /// Another writer got there first; carries the existing key.
    Existing(String),
}

impl SongInsert {
    pub fn id(&self) -> &str {
        match self {
            SongInsert::Inserted(id) | SongInsert::Existing(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogCounts {
    pub artists: usize,
    pub playlists: usize,
    pub songs: usize,
}

/// Default description of a playlist created from a collection folder.
pub fn playlist_description(name: &str) -> String {
    format!("Playlist: {}", name)
}

/// Key used for name-based artist matching.
pub fn artist_name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
