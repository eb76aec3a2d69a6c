//! Ingest stage: publish downloaded audio and record it in the catalog.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::context::SyncContext;
use super::executor::{BatchReport, ItemOutcome};
use super::models::{CatalogId, FailureReason, LocalArtifact, SyncError, DEFAULT_COLLECTION};
use crate::catalog_db::{NewArtist, NewSong, SongInsert};

/// Payload of an ingested or already-known song.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedSong {
    pub song_id: String,
    pub external_track_id: CatalogId,
    pub collection_name: String,
}

pub struct IngestStage {
    ctx: Arc<SyncContext>,
}

impl IngestStage {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    /// List local artifacts, across all collections or in one.
    ///
    /// A missing download root yields an empty list; a missing named
    /// collection is an error.
    pub async fn scan(&self, collection: Option<&str>) -> Result<Vec<LocalArtifact>, SyncError> {
        let fs_error = |e: std::io::Error| SyncError::external(FailureReason::Filesystem, e);
        let artifacts = match collection {
            None => self.ctx.ledger.scan().await.map_err(fs_error)?,
            Some(name) => self
                .ctx
                .ledger
                .scan_collection(name)
                .await
                .map_err(fs_error)?
                .ok_or_else(|| SyncError::CollectionNotFound(name.to_string()))?,
        };

        let collections: std::collections::BTreeSet<&str> = artifacts
            .iter()
            .map(|a| a.collection_name.as_str())
            .collect();
        info!(
            "Found {} songs to process across {} folders",
            artifacts.len(),
            collections.len()
        );
        Ok(artifacts)
    }

    /// Ingest every artifact under the download root.
    pub async fn ingest_all(&self) -> Result<BatchReport<IngestedSong>, SyncError> {
        let artifacts = self.scan(None).await?;
        Ok(self.ingest_artifacts(artifacts).await)
    }

    /// Ingest the artifacts of one collection.
    pub async fn ingest_collection(&self, name: &str) -> Result<BatchReport<IngestedSong>, SyncError> {
        let artifacts = self.scan(Some(name)).await?;
        Ok(self.ingest_artifacts(artifacts).await)
    }

    pub async fn ingest_artifacts(&self, artifacts: Vec<LocalArtifact>) -> BatchReport<IngestedSong> {
        self.ingest_artifacts_observed(artifacts, |_| {}).await
    }

    pub async fn ingest_artifacts_observed<O>(
        &self,
        artifacts: Vec<LocalArtifact>,
        observer: O,
    ) -> BatchReport<IngestedSong>
    where
        O: FnMut(&ItemOutcome<IngestedSong>),
    {
        if artifacts.is_empty() {
            warn!("No songs found to process");
            return BatchReport::default();
        }

        info!(
            "Processing {} songs with {} workers",
            artifacts.len(),
            self.ctx.executor.workers()
        );
        let ctx = self.ctx.clone();
        let report = self
            .ctx
            .executor
            .run_observed(
                artifacts,
                move |artifact| {
                    let ctx = ctx.clone();
                    async move { ingest_one(&ctx, artifact).await }
                },
                observer,
            )
            .await;
        report.log_summary("Ingest");
        report
    }
}

fn persistence_failure(what: &str, e: anyhow::Error) -> ItemOutcome<IngestedSong> {
    error!("Failed to {}: {:#}", what, e);
    ItemOutcome::Failed(SyncError::external(
        FailureReason::Persistence,
        e.context(format!("Failed to {}", what)),
    ))
}

/// Ingest a single artifact. Never fails outward; every error becomes an outcome.
pub async fn ingest_one(ctx: &SyncContext, artifact: LocalArtifact) -> ItemOutcome<IngestedSong> {
    let collection = artifact.collection_name.clone();

    let id = match artifact.parse_identifier() {
        Ok(id) => id,
        Err(e) => {
            warn!("Skipping {:?}: {}", artifact.base_name, e);
            return ItemOutcome::Failed(e);
        }
    };

    // Idempotency gate
    match ctx.db.find_song_by_external_id(id.as_str()) {
        Ok(Some(song_id)) => {
            debug!("Song already processed: {}", artifact.base_name);
            return ItemOutcome::Skipped(IngestedSong {
                song_id,
                external_track_id: id,
                collection_name: collection,
            });
        }
        Ok(None) => {}
        Err(e) => return persistence_failure("look up song", e),
    }

    let track = match ctx.fetch_track(&id).await {
        Ok(track) => track,
        Err(e) => return ItemOutcome::Failed(e),
    };

    let mut artist_ids = Vec::with_capacity(track.artists.len());
    for artist in &track.artists {
        let new_artist = NewArtist {
            name: artist.name.clone(),
            external_artist_id: artist.id.clone(),
            artwork_url: artist.artwork_url(),
        };
        match ctx.db.get_or_create_artist(&new_artist) {
            Ok(artist_id) => artist_ids.push(artist_id),
            Err(e) => error!("Error resolving artist '{}': {:#}", artist.name, e),
        }
    }
    if artist_ids.is_empty() {
        error!("No artists resolved for {}", id);
        return ItemOutcome::Failed(SyncError::NoArtists(id.to_string()));
    }

    let artwork_url = track.artwork_url();

    let asset = match ctx.upload(&artifact.file_path).await {
        Ok(asset) => asset,
        Err(e) => {
            error!("Failed to upload {:?}: {}", artifact.file_path, e);
            return ItemOutcome::Failed(e);
        }
    };
    info!("Uploaded: {}", artifact.base_name);

    let duration_seconds = match ctx.probe.duration_seconds(&artifact.file_path).await {
        Ok(duration) => duration,
        Err(e) => {
            warn!(
                "Could not read duration for {:?}: {}",
                artifact.file_path, e
            );
            0.0
        }
    };

    let song = NewSong {
        title: track.name.clone(),
        artist_ids,
        duration_seconds,
        file_url: asset.secure_url,
        artwork_url,
        external_track_id: id.to_string(),
    };
    let song_id = match ctx.db.insert_song(&song) {
        Ok(SongInsert::Inserted(song_id)) => song_id,
        Ok(SongInsert::Existing(song_id)) => {
            // A concurrent worker persisted the same track first
            debug!("Song {} was persisted concurrently", id);
            return ItemOutcome::Skipped(IngestedSong {
                song_id,
                external_track_id: id,
                collection_name: collection,
            });
        }
        Err(e) => return persistence_failure("insert song", e),
    };

    if !collection.eq_ignore_ascii_case(DEFAULT_COLLECTION) {
        let linked = ctx
            .db
            .get_or_create_playlist(&collection)
            .and_then(|playlist_id| ctx.db.add_song_to_playlist(&playlist_id, &song_id));
        match linked {
            Ok(_) => info!("Added to playlist: {}", collection),
            Err(e) => return persistence_failure("link song to playlist", e),
        }
    }

    info!(
        "Processed: {} by {} (+{} others) (folder: {})",
        track.name,
        track.primary_artist_name(),
        song.artist_ids.len() - 1,
        collection
    );
    ItemOutcome::Success(IngestedSong {
        song_id,
        external_track_id: id,
        collection_name: collection,
    })
}
