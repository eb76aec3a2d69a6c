//! Download and ingest pipeline.
//!
//! The download stage turns catalog identifiers into audio files under the
//! download root; the ingest stage turns those files into catalog records.
//! Both fan their items out over a shared [`BatchExecutor`] and route every
//! external call through the [`RetryPolicy`].

mod context;
mod download;
mod executor;
mod ingest;
mod ledger;
mod models;
mod pacer;
mod retry_policy;

pub use context::SyncContext;
pub use download::{
    download_one, DownloadStage, DownloadedTrack, ParsedReferences, ResolvedPlaylist,
};
pub use executor::{BatchCounts, BatchExecutor, BatchReport, ItemOutcome};
pub use ingest::{ingest_one, IngestStage, IngestedSong};
pub use ledger::{sanitize_component, DownloadLedger};
pub use models::{
    extract_id, extract_id_of_kind, parse_artifact_identifier, resolve_playlist_reference,
    resolve_reference, resolve_track_reference, CatalogId, FailureReason, LocalArtifact,
    ReferenceKind, SyncError, TrackDescriptor, CATALOG_ID_LEN, DEFAULT_COLLECTION, ID_SEPARATOR,
};
pub use pacer::RequestPacer;
pub use retry_policy::RetryPolicy;
