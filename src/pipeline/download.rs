//! Download stage: turn catalog identifiers into audio files on disk.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::context::SyncContext;
use super::executor::{BatchReport, ItemOutcome};
use super::ledger::DownloadLedger;
use super::models::{
    resolve_playlist_reference, resolve_track_reference, CatalogId, FailureReason, SyncError,
    TrackDescriptor, DEFAULT_COLLECTION,
};

/// Payload of a successful or skipped download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedTrack {
    pub identifier: CatalogId,
    pub title: String,
    /// Audio file on disk, if it could be located after the download.
    pub path: Option<PathBuf>,
}

/// Members of a playlist, ready to be downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlaylist {
    pub name: String,
    pub track_ids: Vec<CatalogId>,
}

/// Raw track references split into dispatchable identifiers and rejects.
#[derive(Debug, Default)]
pub struct ParsedReferences {
    /// Unique identifiers, first occurrence order.
    pub ids: Vec<CatalogId>,
    pub rejected: Vec<SyncError>,
}

impl ParsedReferences {
    /// Parse bare ids, track URLs and track URIs. Anything else, playlist
    /// references included, is rejected as an invalid reference.
    pub fn parse(references: &[String]) -> Self {
        let mut ids = Vec::with_capacity(references.len());
        let mut rejected = Vec::new();
        for reference in references {
            match resolve_track_reference(reference) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!("Skipping unusable track reference {:?}", reference);
                    rejected.push(e);
                }
            }
        }
        Self {
            ids: dedup_preserving_order(ids),
            rejected,
        }
    }

    /// Number of outcomes a download of these references reports.
    pub fn len(&self) -> usize {
        self.ids.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct DownloadStage {
    ctx: Arc<SyncContext>,
}

impl DownloadStage {
    pub fn new(ctx: Arc<SyncContext>) -> Self {
        Self { ctx }
    }

    /// Download raw references (bare ids, URLs or URIs) into the default
    /// collection. Unusable references are reported as failures.
    pub async fn download_references(&self, references: &[String]) -> BatchReport<DownloadedTrack> {
        self.download_references_observed(references, |_| {}).await
    }

    pub async fn download_references_observed<O>(
        &self,
        references: &[String],
        observer: O,
    ) -> BatchReport<DownloadedTrack>
    where
        O: FnMut(&ItemOutcome<DownloadedTrack>),
    {
        self.download_parsed_observed(ParsedReferences::parse(references), observer)
            .await
    }

    /// Download already parsed references. Rejects are reported as failures
    /// through the observer before the batch starts.
    pub async fn download_parsed_observed<O>(
        &self,
        parsed: ParsedReferences,
        mut observer: O,
    ) -> BatchReport<DownloadedTrack>
    where
        O: FnMut(&ItemOutcome<DownloadedTrack>),
    {
        let mut rejected = BatchReport::default();
        for error in parsed.rejected {
            let outcome = ItemOutcome::Failed(error);
            observer(&outcome);
            rejected.record(outcome);
        }

        let mut report = self
            .download_tracks_observed(parsed.ids, DEFAULT_COLLECTION, observer)
            .await;
        report.merge(rejected);
        report
    }

    pub async fn download_tracks(
        &self,
        ids: Vec<CatalogId>,
        collection: &str,
    ) -> BatchReport<DownloadedTrack> {
        self.download_tracks_observed(ids, collection, |_| {}).await
    }

    /// Download every identifier into `collection` on the shared executor.
    ///
    /// Duplicate identifiers are dropped before dispatch, first occurrence wins.
    pub async fn download_tracks_observed<O>(
        &self,
        ids: Vec<CatalogId>,
        collection: &str,
        observer: O,
    ) -> BatchReport<DownloadedTrack>
    where
        O: FnMut(&ItemOutcome<DownloadedTrack>),
    {
        let ids = dedup_preserving_order(ids);
        if ids.is_empty() {
            warn!("No tracks to download");
            return BatchReport::default();
        }

        info!(
            "Downloading {} tracks into '{}' with {} workers",
            ids.len(),
            collection,
            self.ctx.executor.workers()
        );

        let ctx = self.ctx.clone();
        let collection = collection.to_string();
        let report = self
            .ctx
            .executor
            .run_observed(
                ids,
                move |id| {
                    let ctx = ctx.clone();
                    let collection = collection.clone();
                    async move { download_one(&ctx, id, &collection).await }
                },
                observer,
            )
            .await;
        report.log_summary("Download");
        report
    }

    /// Resolve a playlist reference and collect every member identifier,
    /// following pagination.
    pub async fn resolve_playlist(&self, reference: &str) -> Result<ResolvedPlaylist, SyncError> {
        let playlist_id = resolve_playlist_reference(reference)?;
        let playlist = self.ctx.fetch_playlist(&playlist_id).await?;
        info!("Playlist: {}", playlist.name);

        let mut track_ids = Vec::new();
        let mut page = playlist.tracks;
        loop {
            for raw in page.track_ids() {
                match CatalogId::parse(raw) {
                    Ok(id) => track_ids.push(id),
                    // Local files and podcasts carry ids of another shape
                    Err(_) => debug!("Skipping playlist entry with unusable id {:?}", raw),
                }
            }
            match page.next.take() {
                Some(next_url) => page = self.ctx.fetch_playlist_page(&next_url).await?,
                None => break,
            }
        }

        info!("Found {} tracks in playlist", track_ids.len());
        Ok(ResolvedPlaylist {
            name: playlist.name,
            track_ids,
        })
    }

    /// Download every member of a playlist into a collection named after it.
    pub async fn download_playlist(
        &self,
        reference: &str,
    ) -> Result<BatchReport<DownloadedTrack>, SyncError> {
        let playlist = self.resolve_playlist(reference).await?;
        Ok(self
            .download_tracks(playlist.track_ids, &playlist.name)
            .await)
    }
}

fn dedup_preserving_order(ids: Vec<CatalogId>) -> Vec<CatalogId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Download a single track. Never fails outward; every error becomes an outcome.
pub async fn download_one(
    ctx: &SyncContext,
    id: CatalogId,
    collection: &str,
) -> ItemOutcome<DownloadedTrack> {
    let track = match ctx.fetch_track(&id).await {
        Ok(track) => track,
        Err(e) => return ItemOutcome::Failed(e),
    };

    let descriptor = TrackDescriptor {
        name: track.name.clone(),
        artist_name: track.primary_artist_name().to_string(),
        identifier: id,
        collection_name: collection.to_string(),
    };
    let stem = DownloadLedger::artifact_stem(&descriptor.name, &descriptor.identifier);

    if let Err(e) = ctx.ledger.prepare_collection(collection).await {
        error!("Failed to create collection folder '{}': {}", collection, e);
        return ItemOutcome::Failed(SyncError::external(FailureReason::Filesystem, e));
    }

    match ctx.ledger.find_existing(collection, &stem).await {
        Ok(Some(path)) => {
            debug!("Already downloaded: {}", descriptor.name);
            return ItemOutcome::Skipped(DownloadedTrack {
                identifier: descriptor.identifier,
                title: descriptor.name,
                path: Some(path),
            });
        }
        Ok(None) => {}
        Err(e) => {
            return ItemOutcome::Failed(SyncError::external(FailureReason::Filesystem, e));
        }
    }

    let template = ctx.ledger.output_template(collection, &stem);
    if let Err(e) = ctx.fetch_audio(&descriptor.search_query(), &template).await {
        error!(
            "Failed to download {} by {}: {}",
            descriptor.name, descriptor.artist_name, e
        );
        return ItemOutcome::Failed(e);
    }

    let path = ctx.ledger.find_existing(collection, &stem).await.ok().flatten();
    if path.is_none() {
        warn!(
            "Download of {} finished but no file matches {:?}",
            descriptor.name, stem
        );
    }
    info!(
        "Downloaded: {} by {}",
        descriptor.name, descriptor.artist_name
    );
    ItemOutcome::Success(DownloadedTrack {
        identifier: descriptor.identifier,
        title: descriptor.name,
        path,
    })
}
