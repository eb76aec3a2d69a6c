//! SQLite-backed catalog database.

use super::models::*;
use super::schema::{latest_version, CATALOG_VERSIONED_SCHEMAS};
use super::trait_def::CatalogDb;
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

pub struct SqliteCatalogDb {
    conn: Mutex<Connection>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let latest = latest_version();

    if db_version > latest {
        bail!(
            "Catalog database version {} is newer than supported version {}",
            db_version,
            latest
        );
    }
    if db_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in CATALOG_VERSIONED_SCHEMAS
        .iter()
        .filter(|schema| schema.version > db_version)
    {
        info!("Migrating catalog db to version {}", schema.version);
        tx.execute_batch(schema.up)
            .with_context(|| format!("Failed to apply catalog schema v{}", schema.version))?;
    }
    tx.pragma_update(None, "user_version", latest)?;
    tx.commit()?;
    Ok(())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn new_key() -> String {
    Uuid::new_v4().to_string()
}

impl SqliteCatalogDb {
    /// Open (or create) the catalog database at `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let mut conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open catalog database {:?}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate_if_needed(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Catalog database connection lock poisoned"))
    }

    fn load_song(conn: &Connection, id: &str) -> Result<Option<SongRecord>> {
        let song = conn
            .query_row(
                "SELECT id, title, duration_seconds, file_url, artwork_url, is_featured,
                        external_track_id, created_at
                 FROM songs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(SongRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        artist_ids: BTreeSet::new(),
                        duration_seconds: row.get(2)?,
                        file_url: row.get(3)?,
                        artwork_url: row.get(4)?,
                        is_featured: row.get(5)?,
                        external_track_id: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?;

        let Some(mut song) = song else {
            return Ok(None);
        };
        let mut stmt = conn.prepare("SELECT artist_id FROM song_artists WHERE song_id = ?1")?;
        song.artist_ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<String>>>()?;
        Ok(Some(song))
    }

    fn load_playlist(conn: &Connection, column: &str, value: &str) -> Result<Option<PlaylistRecord>> {
        let sql = format!(
            "SELECT id, name, description, created_at FROM playlists WHERE {} = ?1",
            column
        );
        let playlist = conn
            .query_row(&sql, params![value], |row| {
                Ok(PlaylistRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    song_ids: BTreeSet::new(),
                    created_at: row.get(3)?,
                })
            })
            .optional()?;

        let Some(mut playlist) = playlist else {
            return Ok(None);
        };
        let mut stmt = conn.prepare("SELECT song_id FROM playlist_songs WHERE playlist_id = ?1")?;
        playlist.song_ids = stmt
            .query_map(params![playlist.id], |row| row.get(0))?
            .collect::<rusqlite::Result<BTreeSet<String>>>()?;
        Ok(Some(playlist))
    }
}

impl CatalogDb for SqliteCatalogDb {
    fn ping(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("Catalog database ping failed")?;
        Ok(())
    }

    fn find_song_by_external_id(&self, external_track_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM songs WHERE external_track_id = ?1",
                params![external_track_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn insert_song(&self, song: &NewSong) -> Result<SongInsert> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = new_key();
        let inserted = tx.execute(
            "INSERT INTO songs
                (id, title, duration_seconds, file_url, artwork_url, is_featured,
                 external_track_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
             ON CONFLICT(external_track_id) DO NOTHING",
            params![
                id,
                song.title,
                song.duration_seconds,
                song.file_url,
                song.artwork_url,
                song.external_track_id,
                now()
            ],
        )?;

        if inserted == 0 {
            let existing: String = tx.query_row(
                "SELECT id FROM songs WHERE external_track_id = ?1",
                params![song.external_track_id],
                |row| row.get(0),
            )?;
            debug!(
                "Song {} already persisted as {}",
                song.external_track_id, existing
            );
            return Ok(SongInsert::Existing(existing));
        }

        for artist_id in &song.artist_ids {
            tx.execute(
                "INSERT OR IGNORE INTO song_artists (song_id, artist_id) VALUES (?1, ?2)",
                params![id, artist_id],
            )?;
        }
        tx.commit()?;
        Ok(SongInsert::Inserted(id))
    }

    fn get_song(&self, id: &str) -> Result<Option<SongRecord>> {
        let conn = self.conn()?;
        Self::load_song(&conn, id)
    }

    fn get_or_create_artist(&self, artist: &NewArtist) -> Result<String> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let name_key = artist_name_key(&artist.name);

        // 1. Exact external id match
        if let Some(external_id) = &artist.external_artist_id {
            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM artists WHERE external_artist_id = ?1",
                    params![external_id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(id);
            }
        }

        // 2. Name match. Records that already carry a different external id
        // are distinct artists sharing a name.
        let by_name: Option<String> = match &artist.external_artist_id {
            Some(_) => tx
                .query_row(
                    "SELECT id FROM artists
                     WHERE name_key = ?1 AND external_artist_id IS NULL
                     ORDER BY created_at LIMIT 1",
                    params![name_key],
                    |row| row.get(0),
                )
                .optional()?,
            None => tx
                .query_row(
                    "SELECT id FROM artists WHERE name_key = ?1 ORDER BY created_at LIMIT 1",
                    params![name_key],
                    |row| row.get(0),
                )
                .optional()?,
        };

        if let Some(id) = by_name {
            if let Some(external_id) = &artist.external_artist_id {
                tx.execute(
                    "UPDATE artists SET external_artist_id = ?1 WHERE id = ?2",
                    params![external_id, id],
                )?;
                debug!("Backfilled external id for artist '{}'", artist.name);
            }
            if !artist.artwork_url.is_empty() {
                tx.execute(
                    "UPDATE artists SET artwork_url = ?1 WHERE id = ?2 AND artwork_url = ''",
                    params![artist.artwork_url, id],
                )?;
            }
            tx.commit()?;
            return Ok(id);
        }

        // 3. Create
        let id = new_key();
        tx.execute(
            "INSERT INTO artists
                (id, name, name_key, external_artist_id, artwork_url, is_featured, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                id,
                artist.name.trim(),
                name_key,
                artist.external_artist_id,
                artist.artwork_url,
                now()
            ],
        )?;
        tx.commit()?;
        info!("Created artist: {}", artist.name.trim());
        Ok(id)
    }

    fn get_artist(&self, id: &str) -> Result<Option<ArtistRecord>> {
        let conn = self.conn()?;
        let artist = conn
            .query_row(
                "SELECT id, name, external_artist_id, artwork_url, is_featured, created_at
                 FROM artists WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ArtistRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        external_artist_id: row.get(2)?,
                        artwork_url: row.get(3)?,
                        is_featured: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(artist)
    }

    fn get_or_create_playlist(&self, name: &str) -> Result<String> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = tx.execute(
            "INSERT INTO playlists (id, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO NOTHING",
            params![new_key(), name, playlist_description(name), now()],
        )?;
        let id: String = tx.query_row(
            "SELECT id FROM playlists WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        tx.commit()?;
        if created > 0 {
            info!("Created playlist: {}", name);
        }
        Ok(id)
    }

    fn add_song_to_playlist(&self, playlist_id: &str, song_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let added = conn.execute(
            "INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id) VALUES (?1, ?2)",
            params![playlist_id, song_id],
        )?;
        Ok(added > 0)
    }

    fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>> {
        let conn = self.conn()?;
        Self::load_playlist(&conn, "id", id)
    }

    fn find_playlist_by_name(&self, name: &str) -> Result<Option<PlaylistRecord>> {
        let conn = self.conn()?;
        Self::load_playlist(&conn, "name", name)
    }

    fn counts(&self) -> Result<CatalogCounts> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| {
                r.get(0)
            })?;
            Ok(n as usize)
        };
        Ok(CatalogCounts {
            artists: count("artists")?,
            playlists: count("playlists")?,
            songs: count("songs")?,
        })
    }
}
