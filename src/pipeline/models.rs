//! Data models for the sync pipeline.
//!
//! Defines catalog identifiers, per-item descriptors, failure reasons and the
//! error type carried by failed outcomes.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Collection used for tracks downloaded without a playlist context.
pub const DEFAULT_COLLECTION: &str = "all-songs";

/// Separator between the display title and the identifier in artifact names.
pub const ID_SEPARATOR: &str = " -- ";

/// Length of a Spotify base62 identifier.
pub const CATALOG_ID_LEN: usize = 22;

lazy_static! {
    // Track or playlist reference inside a URL or URI
    static ref REFERENCE_PATTERN: Regex =
        Regex::new(r"(?:/|:)(track|playlist)(?:/|:)([A-Za-z0-9]{22})(?:[^A-Za-z0-9]|$)")
            .unwrap();
}

/// A validated 22-character alphanumeric catalog identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatalogId(String);

impl CatalogId {
    /// Validate `value` as a catalog identifier.
    pub fn parse(value: &str) -> Result<Self, SyncError> {
        if is_valid_catalog_id(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(SyncError::InvalidIdentifier(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_catalog_id(value: &str) -> bool {
    value.len() == CATALOG_ID_LEN && value.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Kind of catalog object a URL or URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Track,
    Playlist,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Track => "track",
            ReferenceKind::Playlist => "playlist",
        }
    }
}

/// Extract a catalog identifier from a bare token, a track/playlist URL or a
/// `spotify:track:` style URI.
pub fn extract_id(input: &str) -> Option<CatalogId> {
    extract_reference(input, None)
}

/// Like [`extract_id`], but URLs and URIs must point at `kind`.
///
/// A bare token carries no kind and is always accepted.
pub fn extract_id_of_kind(input: &str, kind: ReferenceKind) -> Option<CatalogId> {
    extract_reference(input, Some(kind))
}

fn extract_reference(input: &str, kind: Option<ReferenceKind>) -> Option<CatalogId> {
    let input = input.trim();
    if is_valid_catalog_id(input) {
        return Some(CatalogId(input.to_string()));
    }
    let captures = REFERENCE_PATTERN.captures(input)?;
    if let Some(kind) = kind {
        if captures.get(1).map(|m| m.as_str()) != Some(kind.as_str()) {
            return None;
        }
    }
    captures.get(2).map(|m| CatalogId(m.as_str().to_string()))
}

/// Like [`extract_id`], but reports unusable input as [`SyncError::InvalidReference`].
pub fn resolve_reference(input: &str) -> Result<CatalogId, SyncError> {
    extract_id(input).ok_or_else(|| SyncError::InvalidReference(input.to_string()))
}

/// Resolve a reference that must name a track or be a bare token.
pub fn resolve_track_reference(input: &str) -> Result<CatalogId, SyncError> {
    extract_id_of_kind(input, ReferenceKind::Track)
        .ok_or_else(|| SyncError::InvalidReference(input.to_string()))
}

/// Resolve a reference that must name a playlist or be a bare token.
pub fn resolve_playlist_reference(input: &str) -> Result<CatalogId, SyncError> {
    extract_id_of_kind(input, ReferenceKind::Playlist)
        .ok_or_else(|| SyncError::InvalidReference(input.to_string()))
}

/// What the download stage needs to know about a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub name: String,
    pub artist_name: String,
    pub identifier: CatalogId,
    pub collection_name: String,
}

impl TrackDescriptor {
    /// Search query handed to the audio-fetch backend.
    pub fn search_query(&self) -> String {
        format!("{} {} audio", self.name, self.artist_name)
    }
}

/// A downloaded audio file discovered on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalArtifact {
    pub collection_name: String,
    pub file_path: PathBuf,
    /// File stem, `"<display title> -- <identifier>"`.
    pub base_name: String,
}

impl LocalArtifact {
    /// Parse the identifier suffix out of the base name.
    pub fn parse_identifier(&self) -> Result<CatalogId, SyncError> {
        parse_artifact_identifier(&self.base_name)
    }
}

/// Parse the identifier encoded in an artifact base name.
///
/// The final `" -- "` segment is authoritative; the title may itself contain
/// the separator.
pub fn parse_artifact_identifier(base_name: &str) -> Result<CatalogId, SyncError> {
    let segments: Vec<&str> = base_name.split(ID_SEPARATOR).collect();
    if segments.len() < 2 {
        return Err(SyncError::InvalidFilename(base_name.to_string()));
    }
    let candidate = segments[segments.len() - 1].trim();
    CatalogId::parse(candidate)
}

/// Why an item ended in the `failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureReason {
    InvalidReference,  // Malformed input - no retry
    InvalidFilename,   // Malformed input - no retry
    InvalidIdentifier, // Malformed input - no retry
    NoArtists,         // Metadata inconsistency
    MetadataFetch,     // Transient, retried
    AudioFetch,        // Transient, retried
    Upload,            // Transient, retried
    Persistence,       // Database error
    Filesystem,        // Local IO error
    Panicked,          // Task panicked inside the executor
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InvalidReference => "invalid_reference",
            FailureReason::InvalidFilename => "invalid_filename",
            FailureReason::InvalidIdentifier => "invalid_identifier",
            FailureReason::NoArtists => "no_artists",
            FailureReason::MetadataFetch => "metadata_fetch",
            FailureReason::AudioFetch => "audio_fetch",
            FailureReason::Upload => "upload",
            FailureReason::Persistence => "persistence",
            FailureReason::Filesystem => "filesystem",
            FailureReason::Panicked => "panicked",
        }
    }

    /// Returns true for failures of an external dependency, which are routed
    /// through the retrier before they surface.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureReason::MetadataFetch
                | FailureReason::AudioFetch
                | FailureReason::Upload
                | FailureReason::Persistence
                | FailureReason::Filesystem
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item-level error of the sync pipeline.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid catalog reference: {0}")]
    InvalidReference(String),

    #[error("invalid filename format: {0}")]
    InvalidFilename(String),

    #[error("invalid catalog identifier: {0}")]
    InvalidIdentifier(String),

    #[error("no artists could be resolved for track {0}")]
    NoArtists(String),

    #[error("{reason} failed: {message}")]
    External {
        reason: FailureReason,
        message: String,
    },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl SyncError {
    /// Wrap an error from an external dependency, keeping the full context chain.
    pub fn external(reason: FailureReason, error: impl Into<anyhow::Error>) -> Self {
        SyncError::External {
            reason,
            message: format!("{:#}", error.into()),
        }
    }

    pub fn reason(&self) -> FailureReason {
        match self {
            SyncError::InvalidReference(_) => FailureReason::InvalidReference,
            SyncError::InvalidFilename(_) => FailureReason::InvalidFilename,
            SyncError::InvalidIdentifier(_) => FailureReason::InvalidIdentifier,
            SyncError::NoArtists(_) => FailureReason::NoArtists,
            SyncError::External { reason, .. } => *reason,
            SyncError::CollectionNotFound(_) => FailureReason::Filesystem,
            SyncError::Panicked(_) => FailureReason::Panicked,
        }
    }
}
