//! SpotSync library
//!
//! Downloads audio for Spotify tracks and playlists, then ingests the
//! downloaded files into a catalog database with artwork, artists and
//! playlists resolved from the Spotify API.

pub mod audio;
pub mod blob_store;
pub mod catalog_db;
pub mod cli_style;
pub mod config;
pub mod pipeline;
pub mod spotify;

pub use catalog_db::{CatalogDb, SqliteCatalogDb};
pub use config::AppConfig;
pub use pipeline::{
    BatchExecutor, BatchReport, CatalogId, DownloadStage, IngestStage, ItemOutcome, RetryPolicy,
    SyncContext, SyncError,
};
