//! Schema definition for the catalog database.

/// One step of the catalog schema.
pub struct CatalogSchema {
    pub version: i64,
    pub up: &'static str,
}

pub const CATALOG_VERSIONED_SCHEMAS: &[CatalogSchema] = &[CatalogSchema {
    version: 1,
    up: r#"
            CREATE TABLE IF NOT EXISTS artists (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                name_key TEXT NOT NULL,
                external_artist_id TEXT UNIQUE,
                artwork_url TEXT NOT NULL DEFAULT '',
                is_featured INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_artists_name_key ON artists(name_key);

            CREATE TABLE IF NOT EXISTS playlists (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS songs (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                duration_seconds REAL NOT NULL DEFAULT 0,
                file_url TEXT NOT NULL,
                artwork_url TEXT NOT NULL DEFAULT '',
                is_featured INTEGER NOT NULL DEFAULT 0,
                external_track_id TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS song_artists (
                song_id TEXT NOT NULL REFERENCES songs(id),
                artist_id TEXT NOT NULL REFERENCES artists(id),
                PRIMARY KEY (song_id, artist_id)
            );

            CREATE TABLE IF NOT EXISTS playlist_songs (
                playlist_id TEXT NOT NULL REFERENCES playlists(id),
                song_id TEXT NOT NULL REFERENCES songs(id),
                PRIMARY KEY (playlist_id, song_id)
            );
        "#,
}];

pub fn latest_version() -> i64 {
    CATALOG_VERSIONED_SCHEMAS
        .last()
        .map(|schema| schema.version)
        .unwrap_or(0)
}
