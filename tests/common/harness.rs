//! Pipeline context wired to the fakes, a temporary download root and an
//! in-memory catalog database.

use spotsync::catalog_db::SqliteCatalogDb;
use spotsync::pipeline::{
    BatchExecutor, DownloadLedger, DownloadStage, IngestStage, RequestPacer, RetryPolicy,
    SyncContext,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::constants::PROBED_DURATION;
use super::fakes::{FakeAudio, FakeMetadata, FakeProbe, FakeUploader};

pub const TEST_WORKERS: usize = 3;
pub const TEST_ATTEMPTS: u32 = 3;

pub struct TestPipeline {
    pub ctx: Arc<SyncContext>,
    pub db: Arc<SqliteCatalogDb>,
    pub metadata: Arc<FakeMetadata>,
    pub audio: Arc<FakeAudio>,
    pub uploader: Arc<FakeUploader>,
    // Dropped last, removes the download root
    _temp_dir: TempDir,
    root: PathBuf,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_probe(FakeProbe {
            duration: Some(PROBED_DURATION),
        })
    }

    /// Pipeline whose duration probe always fails.
    pub fn with_broken_probe() -> Self {
        Self::with_probe(FakeProbe { duration: None })
    }

    fn with_probe(probe: FakeProbe) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("downloaded-songs");

        let db = Arc::new(SqliteCatalogDb::in_memory().expect("Failed to open catalog db"));
        let metadata = Arc::new(FakeMetadata::with_fixtures());
        let audio = Arc::new(FakeAudio::default());
        let uploader = Arc::new(FakeUploader::default());

        let ctx = Arc::new(SyncContext {
            metadata: metadata.clone(),
            audio: audio.clone(),
            uploader: uploader.clone(),
            probe: Arc::new(probe),
            db: db.clone(),
            ledger: DownloadLedger::new(&root),
            retry: RetryPolicy::immediate(TEST_ATTEMPTS),
            pacer: RequestPacer::unpaced(),
            executor: BatchExecutor::new(TEST_WORKERS),
        });

        Self {
            ctx,
            db,
            metadata,
            audio,
            uploader,
            _temp_dir: temp_dir,
            root,
        }
    }

    pub fn download_stage(&self) -> DownloadStage {
        DownloadStage::new(self.ctx.clone())
    }

    pub fn ingest_stage(&self) -> IngestStage {
        IngestStage::new(self.ctx.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Place an audio file under the download root, as a previous download would.
    pub fn place_file(&self, collection: &str, file_name: &str) -> PathBuf {
        let dir = self.root.join(collection);
        std::fs::create_dir_all(&dir).expect("Failed to create collection dir");
        let path = dir.join(file_name);
        std::fs::write(&path, b"fake audio").expect("Failed to write audio file");
        path
    }

    /// Sorted file names in a collection directory.
    pub fn files_in(&self, collection: &str) -> Vec<String> {
        let mut names: Vec<String> = match std::fs::read_dir(self.root.join(collection)) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }
}
