//! On-disk layout of downloaded audio.
//!
//! Files live at `<root>/<collection>/<title> -- <identifier>.<ext>`. The
//! ledger answers "was this identifier already downloaded?" by probing for
//! that filename prefix, and lists artifacts for the ingest stage.
//!
//! Probing is best-effort and not atomic: two tasks targeting the same
//! prefix at once could both miss. The download stage deduplicates
//! identifiers before dispatch so that never happens within one batch.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::models::{CatalogId, LocalArtifact, ID_SEPARATOR};

/// Extensions produced by the audio-fetch backend.
const AUDIO_EXTENSIONS: &[&str] = &["m4a", "mp3", "webm"];

/// Stem suffixes of incomplete downloads.
const TEMP_SUFFIXES: &[&str] = &["_temp", ".part"];

const FORBIDDEN_CHARS: &[char] = &['*', '?', ':', '"', '<', '>', '|'];

#[derive(Debug, Clone)]
pub struct DownloadLedger {
    root: PathBuf,
}

impl DownloadLedger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the download root if it doesn't exist.
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(sanitize_component(collection))
    }

    /// File stem for a track, `"<title> -- <identifier>"`.
    pub fn artifact_stem(title: &str, id: &CatalogId) -> String {
        format!("{}{}{}", sanitize_component(title), ID_SEPARATOR, id)
    }

    /// Output template handed to the audio-fetch backend.
    pub fn output_template(&self, collection: &str, stem: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.%(ext)s", stem))
    }

    /// Create the collection directory and return it.
    pub async fn prepare_collection(&self, collection: &str) -> io::Result<PathBuf> {
        let dir = self.collection_dir(collection);
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Return the first file in the collection whose name starts with `stem`.
    pub async fn find_existing(&self, collection: &str, stem: &str) -> io::Result<Option<PathBuf>> {
        let dir = self.collection_dir(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with(stem) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// List artifacts across every collection directory under the root.
    ///
    /// A missing root yields an empty list.
    pub async fn scan(&self) -> io::Result<Vec<LocalArtifact>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Download folder does not exist: {:?}", self.root);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut artifacts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let collection = entry.file_name().to_string_lossy().to_string();
            artifacts.extend(Self::scan_dir(&entry.path(), &collection).await?);
        }
        artifacts.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(artifacts)
    }

    /// List artifacts in one collection, or `None` if it doesn't exist.
    ///
    /// Artifacts carry the on-disk folder name, same as [`Self::scan`].
    pub async fn scan_collection(&self, collection: &str) -> io::Result<Option<Vec<LocalArtifact>>> {
        let dir = self.collection_dir(collection);
        if !fs::try_exists(&dir).await? {
            return Ok(None);
        }
        let mut artifacts = Self::scan_dir(&dir, &sanitize_component(collection)).await?;
        artifacts.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(Some(artifacts))
    }

    async fn scan_dir(dir: &Path, collection: &str) -> io::Result<Vec<LocalArtifact>> {
        let mut artifacts = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !is_audio_file(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            if TEMP_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix)) {
                debug!("Skipping incomplete download: {:?}", path);
                continue;
            }
            artifacts.push(LocalArtifact {
                collection_name: collection.to_string(),
                file_path: path,
                base_name: stem,
            });
        }
        Ok(artifacts)
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Make a title or collection name safe to use as a single path component.
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
