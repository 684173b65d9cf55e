//! Command line interface.

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr, eyre};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};
use vertex_file::{Context, Downloader, PipelineArgs, UploadOptions, UploadResult, Uploader};
use vertex_swarm_act::{AccessController, GrantKey, HistoryController};
use vertex_swarm_postage::{Batch, BatchLedger};
use vertex_swarm_primitives::{ChunkAddress, Reference};
use vertex_swarm_storer::{ChunkStore, PinStore, RedbChunkStore};
use vertex_swarm_tags::SessionTracker;

use crate::logging::{LogArgs, init_logging};

/// Default chunk database file.
const DEFAULT_STORE_PATH: &str = "vertex-chunks.redb";

/// Default local batch depth: 2^22 stamps.
const DEFAULT_BATCH_DEPTH: u8 = 22;

/// Default local batch bucket depth.
const DEFAULT_BUCKET_DEPTH: u8 = 16;

/// Vertex - store and retrieve files as Swarm chunks
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    #[command(flatten)]
    pub(crate) store: StoreArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Split a file into chunks, stamp and store them.
    Upload(UploadArgs),
    /// Reassemble a file from its reference.
    Download(DownloadArgs),
    /// Print the length of the file behind a reference.
    Stat(StatArgs),
}

/// Local chunk store.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Storage")]
#[serde(default)]
pub(crate) struct StoreArgs {
    /// Path of the chunk database.
    #[arg(long = "store.path", default_value = DEFAULT_STORE_PATH, global = true)]
    pub(crate) path: PathBuf,
}

impl Default for StoreArgs {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl StoreArgs {
    fn open(&self) -> Result<Arc<RedbChunkStore>> {
        let store = RedbChunkStore::open(&self.path)
            .wrap_err_with(|| format!("opening chunk store at {}", self.path.display()))?;
        Ok(Arc::new(store))
    }
}

/// Local postage batch used to stamp uploads.
///
/// The batch and its signer live for one invocation only.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Postage")]
#[serde(default)]
pub(crate) struct PostageArgs {
    /// Batch identifier.
    #[arg(long = "postage.batch", default_value_t = B256::repeat_byte(0x01))]
    pub(crate) batch_id: B256,

    /// Batch depth; the batch holds 2^depth stamps.
    #[arg(long = "postage.depth", default_value_t = DEFAULT_BATCH_DEPTH)]
    pub(crate) depth: u8,

    /// Bucket depth; chunks are spread over 2^bucket-depth buckets.
    #[arg(long = "postage.bucket-depth", default_value_t = DEFAULT_BUCKET_DEPTH)]
    pub(crate) bucket_depth: u8,
}

impl Default for PostageArgs {
    fn default() -> Self {
        Self {
            batch_id: B256::repeat_byte(0x01),
            depth: DEFAULT_BATCH_DEPTH,
            bucket_depth: DEFAULT_BUCKET_DEPTH,
        }
    }
}

impl PostageArgs {
    fn ledger(&self) -> Result<Arc<BatchLedger>> {
        let signer = PrivateKeySigner::random();
        let batch = Batch::builder()
            .id(self.batch_id)
            .owner(signer.address())
            .depths(self.depth, self.bucket_depth)
            .usable(true)
            .build()?;

        let ledger = BatchLedger::new();
        ledger.insert(batch, signer)?;
        Ok(Arc::new(ledger))
    }
}

/// Access control.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Access Control")]
pub(crate) struct AccessArgs {
    /// Hex secret that derives grant keys.
    #[arg(long = "act.secret", env = "VERTEX_ACT_SECRET", value_name = "HEX", hide_env_values = true)]
    pub(crate) secret: Option<GrantKey>,

    /// Grant history entry to read from, or extend on upload.
    #[arg(long = "act.history", value_name = "ADDRESS")]
    pub(crate) history: Option<ChunkAddress>,
}

impl AccessArgs {
    fn controller(&self) -> Option<Arc<dyn AccessController>> {
        self.secret
            .map(|secret| Arc::new(HistoryController::new(secret)) as Arc<dyn AccessController>)
    }
}

#[derive(Debug, Args)]
pub(crate) struct UploadArgs {
    /// File to upload; reads stdin when absent.
    pub(crate) file: Option<PathBuf>,

    /// Encrypt every chunk.
    #[arg(long)]
    pub(crate) encrypt: bool,

    /// Pin the uploaded chunks locally.
    #[arg(long)]
    pub(crate) pin: bool,

    /// Grant access through the history; requires `--act.secret`.
    #[arg(long)]
    pub(crate) act: bool,

    #[command(flatten)]
    pub(crate) pipeline: PipelineArgs,

    #[command(flatten)]
    pub(crate) postage: PostageArgs,

    #[command(flatten)]
    pub(crate) access: AccessArgs,
}

impl UploadArgs {
    fn options(&self) -> UploadOptions {
        let options = UploadOptions::new(self.postage.batch_id)
            .with_pin(self.pin)
            .with_deferred(self.pipeline.deferred)
            .with_encrypt(self.encrypt)
            .with_redundancy(self.pipeline.redundancy());
        if self.act {
            options.with_access_control(self.access.history)
        } else {
            options
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct DownloadArgs {
    /// Reference to download, 64 or 128 hex characters.
    pub(crate) reference: Reference,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) pipeline: PipelineArgs,

    #[command(flatten)]
    pub(crate) access: AccessArgs,
}

#[derive(Debug, Args)]
pub(crate) struct StatArgs {
    /// Reference to inspect.
    pub(crate) reference: Reference,

    #[command(flatten)]
    pub(crate) access: AccessArgs,
}

/// Context cancelled on Ctrl-C.
fn interruptible() -> Context {
    let (ctx, handle) = Context::with_cancel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            handle.cancel();
        }
    });
    ctx
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    init_logging(&cli.logs)?;
    let ctx = interruptible();
    let store = cli.store.open()?;

    match cli.command {
        Commands::Upload(args) => {
            let result = upload(&ctx, store, &args).await?;
            println!("reference: {}", result.reference);
            if let Some(encrypted) = result.encrypted_reference {
                println!("encrypted reference: {encrypted}");
            }
            if let Some(history) = result.history_address {
                println!("history: {}", history.to_hex());
            }
            if let Some(tag) = result.tag {
                println!("tag: {tag}");
            }
        }
        Commands::Download(args) => match &args.output {
            Some(path) => {
                let mut file = tokio::fs::File::create(path)
                    .await
                    .wrap_err_with(|| format!("creating {}", path.display()))?;
                download(&ctx, store, &args, &mut file).await?;
            }
            None => {
                download(&ctx, store, &args, &mut tokio::io::stdout()).await?;
            }
        },
        Commands::Stat(args) => {
            let downloader = downloader(store, &args.access);
            let length = downloader
                .length(&ctx, &args.reference, args.access.history.as_ref())
                .await?;
            println!("{length}");
        }
    }
    Ok(())
}

pub(crate) async fn upload(
    ctx: &Context,
    store: Arc<dyn ChunkStore>,
    args: &UploadArgs,
) -> Result<UploadResult> {
    args.pipeline.validate().map_err(|err| eyre!(err))?;
    if args.act && args.access.secret.is_none() {
        return Err(eyre!("--act requires --act.secret"));
    }

    let mut uploader = Uploader::new(
        store,
        args.postage.ledger()?,
        Arc::new(SessionTracker::new()),
        PinStore::new(),
    )
    .with_args(&args.pipeline);
    if let Some(controller) = args.access.controller() {
        uploader = uploader.with_access_controller(controller);
    }

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .wrap_err_with(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let options = args.options();
    let result = uploader
        .upload(ctx, reader, &options)
        .await
        .wrap_err("upload failed")?;

    if let Some(tag) = result.tag.and_then(|uid| uploader.tags().get(uid).ok()) {
        let snapshot = tag.snapshot();
        info!(
            uid = snapshot.uid,
            split = snapshot.split,
            stored = snapshot.stored,
            seen = snapshot.seen,
            status = %snapshot.status,
            "upload complete"
        );
    }
    Ok(result)
}

fn downloader(store: Arc<dyn ChunkStore>, access: &AccessArgs) -> Downloader {
    let downloader = Downloader::new(store);
    match access.controller() {
        Some(controller) => downloader.with_access_controller(controller),
        None => downloader,
    }
}

pub(crate) async fn download<W>(
    ctx: &Context,
    store: Arc<dyn ChunkStore>,
    args: &DownloadArgs,
    out: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    args.pipeline.validate().map_err(|err| eyre!(err))?;
    let downloader = downloader(store, &args.access).with_args(&args.pipeline);
    let mut stream = downloader
        .download(ctx, &args.reference, args.access.history.as_ref())
        .await
        .wrap_err("download failed")?;

    let mut written = 0u64;
    while let Some(bytes) = stream.try_next().await? {
        out.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }
    out.flush().await?;
    info!(reference = %args.reference, bytes = written, "download complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("vertex").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_upload_flags() {
        let cli = parse(&[
            "--store.path",
            "/tmp/chunks.redb",
            "upload",
            "data.bin",
            "--encrypt",
            "--pin",
            "--upload.redundancy",
            "strong",
            "--postage.depth",
            "20",
        ]);
        assert_eq!(cli.store.path, PathBuf::from("/tmp/chunks.redb"));
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.file, Some(PathBuf::from("data.bin")));
        assert_eq!(args.postage.depth, 20);
        assert_eq!(args.postage.bucket_depth, DEFAULT_BUCKET_DEPTH);

        let options = args.options();
        assert!(options.encrypt);
        assert!(options.pin);
        assert!(!options.access_control);
    }

    #[test]
    fn test_per_run_state_has_no_flags() {
        // Tags and batch state live for one invocation only.
        assert!(Cli::try_parse_from(["vertex", "upload", "--tag", "5"]).is_err());
        assert!(Cli::try_parse_from(["vertex", "upload", "--postage.immutable"]).is_err());
        assert!(Cli::try_parse_from(["vertex", "upload", "--postage.depth", "18"]).is_ok());
    }

    #[test]
    fn test_download_requires_reference() {
        assert!(Cli::try_parse_from(["vertex", "download"]).is_err());
        assert!(Cli::try_parse_from(["vertex", "download", "zz"]).is_err());
    }

    #[test]
    fn test_global_log_flags() {
        let reference = "ab".repeat(32);
        let cli = parse(&["stat", &reference, "-vv", "--log.filter", "vertex_file=trace"]);
        assert_eq!(cli.logs.verbosity, 2);
        assert_eq!(cli.logs.filter.as_deref(), Some("vertex_file=trace"));
    }

    #[tokio::test]
    async fn test_upload_then_download_through_redb() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.bin");
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&input, &data).unwrap();

        let store_args = StoreArgs {
            path: dir.path().join("chunks.redb"),
        };
        let store = store_args.open().unwrap();
        let ctx = Context::background();

        let cli = parse(&["upload", input.to_str().unwrap(), "--encrypt"]);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        let result = upload(&ctx, store.clone(), &args).await.unwrap();
        assert!(result.reference.is_encrypted());

        let reference = result.reference.to_string();
        let cli = parse(&["download", &reference]);
        let Commands::Download(args) = cli.command else {
            panic!("expected download");
        };
        let mut out = Vec::new();
        let written = download(&ctx, store, &args, &mut out).await.unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_act_upload_needs_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = StoreArgs {
            path: dir.path().join("chunks.redb"),
        }
        .open()
        .unwrap();

        let cli = parse(&["upload", "missing.bin", "--act"]);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        let err = upload(&Context::background(), store, &args).await.unwrap_err();
        assert!(err.to_string().contains("--act.secret"));
    }
}
