use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spotsync::audio::{FfprobeProbe, YtDlpFetcher};
use spotsync::blob_store::CloudinaryUploader;
use spotsync::catalog_db::{CatalogDb, SqliteCatalogDb};
use spotsync::cli_style;
use spotsync::config::{AppConfig, CliConfig, Credentials, EnvVars, FileConfig};
use spotsync::pipeline::{
    BatchExecutor, BatchReport, DownloadLedger, DownloadStage, DownloadedTrack, IngestStage,
    IngestedSong, ItemOutcome, ParsedReferences, RequestPacer, RetryPolicy, SyncContext, SyncError,
};
use spotsync::spotify::{MetadataProvider, SpotifyClient};

#[derive(Parser, Debug)]
#[command(name = "spotsync", version, about, styles = cli_style::get_styles())]
struct CliArgs {
    /// Path to a TOML config file. Its values override flags and environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of items processed concurrently.
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Root folder for downloaded audio.
    #[arg(long, global = true)]
    download_dir: Option<PathBuf>,

    /// Path to the SQLite catalog database.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download tracks into the "all-songs" collection.
    DownloadTrack {
        /// Track ids, URLs or spotify:track: URIs.
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Download every track of a playlist into a collection named after it.
    DownloadPlaylist {
        /// Playlist id, URL or spotify:playlist: URI.
        reference: String,
    },
    /// Upload downloaded audio and record it in the catalog database.
    Ingest {
        /// Only ingest this collection folder.
        #[arg(long)]
        collection: Option<String>,
    },
    /// Print record counts from the catalog database.
    Stats,
}

fn init_tracing(config: &AppConfig) -> Result<()> {
    let default_level: LevelFilter = config
        .default_log_level()
        .parse()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn open_catalog_db(config: &AppConfig) -> Result<Arc<SqliteCatalogDb>> {
    info!("Opening catalog database at {:?}...", config.database_path);
    let db = SqliteCatalogDb::open(&config.database_path)?;
    db.ping()?;
    Ok(Arc::new(db))
}

/// Build the shared context, failing fast if any external service is unusable.
async fn build_context(config: &AppConfig, env: &EnvVars) -> Result<Arc<SyncContext>> {
    let credentials = Credentials::from_env(env)?;

    let spotify = SpotifyClient::new(credentials.spotify, config.http_timeout)?;
    spotify
        .authenticate()
        .await
        .context("Spotify authentication failed")?;

    let uploader = CloudinaryUploader::new(
        credentials.cloudinary,
        config.cloudinary_folder.clone(),
        config.http_timeout,
    )?;
    uploader
        .check_credentials()
        .context("Cloudinary configuration invalid")?;

    let db = open_catalog_db(config)?;

    let ledger = DownloadLedger::new(&config.download_folder);
    ledger
        .init()
        .await
        .with_context(|| format!("Failed to create download folder {:?}", config.download_folder))?;

    Ok(Arc::new(SyncContext {
        metadata: Arc::new(spotify),
        audio: Arc::new(YtDlpFetcher::new(config.yt_dlp_path.clone())),
        uploader: Arc::new(uploader),
        probe: Arc::new(FfprobeProbe::new(config.ffprobe_path.clone())),
        db,
        ledger,
        retry: RetryPolicy::new(&config.retry),
        pacer: RequestPacer::new(config.metadata_rate_limit_delay),
        executor: BatchExecutor::new(config.max_workers),
    }))
}

fn progress_observer<P>(pb: &indicatif::ProgressBar) -> impl FnMut(&ItemOutcome<P>) + '_ {
    move |outcome| {
        if let ItemOutcome::Failed(e) = outcome {
            pb.set_message(format!("last failure: {}", e.reason()));
        }
        pb.inc(1);
    }
}

fn finish<P>(label: &str, report: &BatchReport<P>) {
    cli_style::print_batch_summary(label, report.counts(), &report.failure_breakdown());
}

async fn run_download_tracks(ctx: Arc<SyncContext>, references: &[String]) {
    let stage = DownloadStage::new(ctx);
    let parsed = ParsedReferences::parse(references);
    let pb = cli_style::batch_progress_bar(parsed.len(), "download");
    let report = stage
        .download_parsed_observed(parsed, progress_observer::<DownloadedTrack>(&pb))
        .await;
    pb.finish_and_clear();
    finish("Download", &report);
}

async fn run_download_playlist(ctx: Arc<SyncContext>, reference: &str) -> Result<()> {
    let stage = DownloadStage::new(ctx);
    let playlist = stage.resolve_playlist(reference).await?;
    if playlist.track_ids.is_empty() {
        cli_style::print_warning(&format!("Playlist '{}' has no tracks", playlist.name));
        return Ok(());
    }

    let pb = cli_style::batch_progress_bar(playlist.track_ids.len(), &playlist.name);
    let report = stage
        .download_tracks_observed(
            playlist.track_ids,
            &playlist.name,
            progress_observer::<DownloadedTrack>(&pb),
        )
        .await;
    pb.finish_and_clear();
    finish("Download", &report);
    Ok(())
}

async fn run_ingest(ctx: Arc<SyncContext>, collection: Option<&str>) -> Result<()> {
    let stage = IngestStage::new(ctx);
    let artifacts = match stage.scan(collection).await {
        Ok(artifacts) => artifacts,
        Err(SyncError::CollectionNotFound(name)) => bail!("Collection folder not found: {}", name),
        Err(e) => return Err(e.into()),
    };
    if artifacts.is_empty() {
        cli_style::print_warning("No songs found to process");
        return Ok(());
    }

    let pb = cli_style::batch_progress_bar(artifacts.len(), "ingest");
    let report = stage
        .ingest_artifacts_observed(artifacts, progress_observer::<IngestedSong>(&pb))
        .await;
    pb.finish_and_clear();
    finish("Ingest", &report);
    Ok(())
}

async fn run(cli_args: CliArgs, config: AppConfig, env: EnvVars) -> Result<()> {
    if let Command::Stats = cli_args.command {
        let db = open_catalog_db(&config)?;
        cli_style::print_catalog_counts(db.counts()?);
        return Ok(());
    }

    let ctx = build_context(&config, &env).await?;
    match cli_args.command {
        Command::DownloadTrack { references } => run_download_tracks(ctx, &references).await,
        Command::DownloadPlaylist { reference } => run_download_playlist(ctx, &reference).await?,
        Command::Ingest { collection } => run_ingest(ctx, collection.as_deref()).await?,
        Command::Stats => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let env: EnvVars = std::env::vars().collect();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        download_dir: cli_args.download_dir.clone(),
        workers: cli_args.workers,
    };
    let config = AppConfig::resolve(&cli_config, file_config, &env)?;
    init_tracing(&config)?;

    if let Err(e) = run(cli_args, config, env).await {
        cli_style::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
