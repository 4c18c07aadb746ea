//! holdersync - syncs NFT holder balances from a paginated source into SQL.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use holdersync::ingester::provider;
use holdersync::{
    database_url, persistence, sync_holders, Collection, Config, HolderTable, HoldersyncRepo,
    Repo, SyncReport,
};

#[derive(Parser, Debug)]
#[command(name = "holdersync", about = "Sync NFT holder balances into SQL")]
struct Cli {
    /// Path to the sync configuration file
    #[arg(long, default_value = "holdersync.json")]
    config: PathBuf,
    /// Commit results to the store; without this flag the run is a preview
    #[arg(long)]
    apply: bool,
    /// Target the remote store instead of the local one
    #[arg(long)]
    remote: bool,
    /// Also print the machine-readable summary
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SourceKind {
    Indexer,
    ChainRpc,
}

#[derive(Debug, Deserialize)]
struct SourceFile {
    kind: SourceKind,
    url: String,
}

/// On-disk shape of the sync configuration.
#[derive(Debug, Deserialize)]
struct SyncFile {
    source: SourceFile,
    collections: Vec<Collection>,
    batch_size: Option<u64>,
    fetch_rate_ms: Option<u64>,
    rate_limit_backoff_ms: Option<u64>,
    retry_backoff_ms: Option<u64>,
    max_retries: Option<u32>,
    request_timeout_ms: Option<u64>,
    empty_batch_threshold: Option<u32>,
    persist_batch_size: Option<usize>,
}

impl SyncFile {
    fn to_config(&self) -> Config {
        let mut config = Config::new();
        for collection in &self.collections {
            config = config.add_collection(collection.clone());
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(fetch_rate_ms) = self.fetch_rate_ms {
            config = config.with_fetch_rate_ms(fetch_rate_ms);
        }
        if let Some(rate_limit_backoff_ms) = self.rate_limit_backoff_ms {
            config = config.with_rate_limit_backoff_ms(rate_limit_backoff_ms);
        }
        if let Some(retry_backoff_ms) = self.retry_backoff_ms {
            config = config.with_retry_backoff_ms(retry_backoff_ms);
        }
        if let Some(max_retries) = self.max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(request_timeout_ms) = self.request_timeout_ms {
            config = config.with_request_timeout_ms(request_timeout_ms);
        }
        if let Some(empty_batch_threshold) = self.empty_batch_threshold {
            config = config.with_empty_batch_threshold(empty_batch_threshold);
        }
        if let Some(persist_batch_size) = self.persist_batch_size {
            config = config.with_persist_batch_size(persist_batch_size);
        }

        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let raw = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("cannot read {}", cli.config.display()))?;
    let sync_file: SyncFile = serde_json::from_str(&raw).context("invalid sync configuration")?;
    let config = sync_file.to_config();
    // Fatal at startup, before any network activity.
    config.validate().map_err(|e| anyhow::anyhow!("{e:?}"))?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupt received, shutting down...");
                cancel.cancel();
            }
        });
    }

    let (table, report) = scan(&sync_file, &config, &cancel).await?;

    print!("{report}");
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if cancel.is_cancelled() {
        error!("run interrupted; store untouched");
        return Ok(ExitCode::FAILURE);
    }

    let upserts = persistence::flatten(&table, Utc::now());

    let repo: Option<HoldersyncRepo> = if cli.apply {
        let url = database_url(cli.remote).map_err(|e| anyhow::anyhow!("{e:?}"))?;
        let repo = HoldersyncRepo::connect(&url).await?;
        repo.migrate().await?;
        Some(repo)
    } else {
        None
    };

    match persistence::commit(repo.as_ref(), &upserts, config.persist_batch_size).await {
        Ok(outcome) if cli.apply => {
            info!(
                tuples = outcome.tuples,
                batches = outcome.batches_applied,
                "holder table committed"
            );
        }
        Ok(outcome) => {
            info!(tuples = outcome.tuples, "preview mode; store untouched");
            // Preview always exits zero after printing the summary.
            return Ok(ExitCode::SUCCESS);
        }
        Err(persist_error) => {
            error!("{persist_error}");
            return Ok(ExitCode::FAILURE);
        }
    }

    if report.all_failed() {
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

async fn scan(
    sync_file: &SyncFile,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<(HolderTable, SyncReport)> {
    let outcome = match sync_file.source.kind {
        SourceKind::Indexer => {
            let indexer_provider = provider::indexer(&sync_file.source.url);
            sync_holders(config, &indexer_provider, cancel).await?
        }
        SourceKind::ChainRpc => {
            let chain_provider = provider::chain_rpc(&sync_file.source.url);
            sync_holders(config, &chain_provider, cancel).await?
        }
    };

    Ok(outcome)
}
