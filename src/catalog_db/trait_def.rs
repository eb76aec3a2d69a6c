//! CatalogDb trait definition.

use super::models::{
    ArtistRecord, CatalogCounts, NewArtist, NewSong, PlaylistRecord, SongInsert, SongRecord,
};
use anyhow::Result;

/// Document store for artists, playlists and songs.
///
/// Every write is atomic on its own: concurrent callers asking for the same
/// natural key always end up with the same record.
pub trait CatalogDb: Send + Sync {
    /// Check that the database is reachable.
    fn ping(&self) -> Result<()>;

    // =========================================================================
    // Songs
    // =========================================================================

    /// Key of the song with this external track id, if already persisted.
    fn find_song_by_external_id(&self, external_track_id: &str) -> Result<Option<String>>;

    /// Insert a song unless one with the same external track id exists.
    fn insert_song(&self, song: &NewSong) -> Result<SongInsert>;

    fn get_song(&self, id: &str) -> Result<Option<SongRecord>>;

    // =========================================================================
    // Artists
    // =========================================================================

    /// Resolve an artist by external id, then by name, creating it if neither
    /// matches. A name match without an external id gets it backfilled.
    fn get_or_create_artist(&self, artist: &NewArtist) -> Result<String>;

    fn get_artist(&self, id: &str) -> Result<Option<ArtistRecord>>;

    // =========================================================================
    // Playlists
    // =========================================================================

    /// Key of the playlist with this name, created if missing.
    fn get_or_create_playlist(&self, name: &str) -> Result<String>;

    /// Add a song to a playlist. Returns false if it was already there.
    fn add_song_to_playlist(&self, playlist_id: &str, song_id: &str) -> Result<bool>;

    fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>>;

    fn find_playlist_by_name(&self, name: &str) -> Result<Option<PlaylistRecord>>;

    // =========================================================================
    // Counts
    // =========================================================================

    fn counts(&self) -> Result<CatalogCounts>;
}
