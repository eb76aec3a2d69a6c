//! Shared constants for end-to-end tests
//!
//! Catalog identifiers and titles served by the fake metadata provider.

// ============================================================================
// Tracks
// ============================================================================

pub const TRACK_1_ID: &str = "AaAaAaAaAaAaAaAaAaAaAa";
pub const TRACK_1_TITLE: &str = "Opening Track";

pub const TRACK_2_ID: &str = "BaBaBaBaBaBaBaBaBaBaBa";
pub const TRACK_2_TITLE: &str = "Middle Track";

pub const TRACK_3_ID: &str = "CaCaCaCaCaCaCaCaCaCaCa";
pub const TRACK_3_TITLE: &str = "Closing Track";

pub const TRACK_4_ID: &str = "DaDaDaDaDaDaDaDaDaDaDa";
pub const TRACK_4_TITLE: &str = "Smooth Jazz";

pub const TRACK_5_ID: &str = "EaEaEaEaEaEaEaEaEaEaEa";
pub const TRACK_5_TITLE: &str = "Upbeat Jazz";

/// Track whose metadata lists no artists
pub const ORPHAN_TRACK_ID: &str = "FaFaFaFaFaFaFaFaFaFaFa";
pub const ORPHAN_TRACK_TITLE: &str = "Nobody's Song";

// ============================================================================
// Artists
// ============================================================================

pub const ARTIST_1_ID: &str = "artist-test-band";
pub const ARTIST_1_NAME: &str = "The Test Band";

pub const ARTIST_2_ID: &str = "artist-jazz-ensemble";
pub const ARTIST_2_NAME: &str = "Jazz Ensemble";

// ============================================================================
// Playlists
// ============================================================================

pub const PLAYLIST_ID: &str = "GaGaGaGaGaGaGaGaGaGaGa";
pub const PLAYLIST_NAME: &str = "Road Trip";
pub const PLAYLIST_PAGE_2_URL: &str = "https://api.test/playlists/road-trip/tracks?offset=100";

pub const ALBUM_ARTWORK_URL: &str = "https://img.test/album.jpg";
pub const PROBED_DURATION: f64 = 185.25;
