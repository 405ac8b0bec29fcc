//! `setsync` command line.
//!
//! ```text
//! setsync [--config FILE] bootstrap        # fetch the snapshot if missing, print ready/failed
//! setsync [--config FILE] resolve SET.json # resolve a content set, print it as JSON
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the `-v` verbosity flags.

mod error;
mod offline;

use crate::error::{ErrorKind, Result};
use crate::offline::Offline;
use clap::{Parser, Subcommand};
use exn::ResultExt;
use setsync_config::Config;
use setsync_models::ContentSet;
use setsync_online::{DownloadHandle, HttpDownloader, HttpLookup, LookupHandle};
use setsync_queue::bootstrap::BootstrapState;
use setsync_queue::{Completion, QueueOptions, SharedSet, UpdateQueue};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// Conventional exit status for a process stopped by SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// Reconcile local content sets against the online source.
#[derive(Parser, Debug)]
#[command(name = "setsync", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download and install the snapshot if it isn't present yet.
    Bootstrap,
    /// Resolve every item of a content set read from a JSON file.
    Resolve {
        /// Path to a JSON-encoded content set.
        set: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "setsync failed");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let queue = build_queue(&config)?;
    match cli.command {
        Command::Bootstrap => {
            let state = queue.bootstrap().wait().await;
            println!("{state}");
            Ok(match state {
                BootstrapState::Ready => ExitCode::SUCCESS,
                BootstrapState::Pending | BootstrapState::Failed => ExitCode::FAILURE,
            })
        },
        Command::Resolve { set } => resolve(&queue, &set).await,
    }
}

fn build_queue(config: &Config) -> Result<UpdateQueue> {
    let online: LookupHandle = match &config.online.base_url {
        Some(base_url) => {
            Arc::new(HttpLookup::new(base_url, config.online_timeout()).or_raise(|| ErrorKind::Setup)?)
        },
        None => {
            tracing::info!("no online endpoint configured; lookups are disabled");
            Arc::new(Offline)
        },
    };
    let downloader: DownloadHandle =
        Arc::new(HttpDownloader::new(config.online_timeout()).or_raise(|| ErrorKind::Setup)?);
    let options = QueueOptions {
        snapshot_path: config.snapshot_path(),
        snapshot_url: config.snapshot.url.clone(),
        concurrency: config.queue.concurrency,
    };
    Ok(UpdateQueue::new(options, online, downloader))
}

async fn resolve(queue: &UpdateQueue, path: &Path) -> Result<ExitCode> {
    let set = read_set(path).await?;
    let shared = SharedSet::new(set);

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted; letting in-flight lookups finish");
                token.cancel();
            }
        }
    });

    let completion = queue.update(shared.clone(), token).await;
    write_set(&shared.into_inner())?;
    Ok(match completion {
        Completion::Finished => ExitCode::SUCCESS,
        Completion::Cancelled => ExitCode::from(EXIT_INTERRUPTED),
    })
}

async fn read_set(path: &Path) -> Result<ContentSet> {
    let bytes = tokio::fs::read(path).await.or_raise(|| ErrorKind::Input)?;
    serde_json::from_slice(&bytes).or_raise(|| ErrorKind::Input)
}

fn write_set(set: &ContentSet) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, set).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)
}
