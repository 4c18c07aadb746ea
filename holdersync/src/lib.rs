mod collections;
mod config;
pub mod holders;
pub mod ingester;
pub mod persistence;
mod report;
mod repos;

pub use collections::{Collection, CollectionId};
pub use config::{database_url, Config, ConfigError};
pub use holders::{HolderTable, OwnershipCounts, TokenRecord};
pub use ingester::{IngesterError, Provider, ProviderError, RangeFetch, ScanCursor};
pub use persistence::{HolderUpsert, PersistError, PersistOutcome};
pub use report::{CollectionSummary, FailedCollection, SyncReport};
pub use repos::{HolderRow, Repo, RepoError, SQLikeMigrations};

#[cfg(feature = "postgres")]
pub use repos::PostgresRepo;

#[cfg(feature = "postgres")]
pub type HoldersyncRepo = PostgresRepo;

use derive_more::Display;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::holders::merge_into_table;

#[derive(Debug, Display)]
pub enum HoldersyncError {
    #[display("Config Error: {_0:?}")]
    Config(ConfigError),
    #[display("Repo Error: {_0}")]
    Repo(RepoError),
}

impl From<ConfigError> for HoldersyncError {
    fn from(value: ConfigError) -> Self {
        HoldersyncError::Config(value)
    }
}

impl From<RepoError> for HoldersyncError {
    fn from(value: RepoError) -> Self {
        HoldersyncError::Repo(value)
    }
}

impl std::error::Error for HoldersyncError {}

/// Scans every configured collection and merges the results into one
/// cross-collection holder table.
///
/// Collections run sequentially to bound the outbound request rate
/// against the shared source. One collection's failure never blocks the
/// others; aborted scans are recorded in the report and the run goes on.
/// Cancellation stops the run: the interrupted scan and every collection
/// never attempted are recorded as failed.
pub async fn sync_holders<P: Provider + ?Sized>(
    config: &Config,
    provider: &P,
    cancel: &CancellationToken,
) -> Result<(HolderTable, SyncReport), HoldersyncError> {
    config.validate()?;

    let mut table = HolderTable::new();
    let mut report = SyncReport::default();

    for (position, collection) in config.collections.iter().enumerate() {
        info!(collection = %collection.id, "scanning collection");

        match ingester::ingest(collection, provider, config, cancel).await {
            Ok(counts) => {
                report.record_success(&collection.id, &counts);
                merge_into_table(&mut table, &collection.id, counts);
            }
            Err(ingester_error) => {
                error!(
                    collection = %collection.id,
                    error = %ingester_error,
                    "collection scan aborted"
                );
                let cancelled = matches!(ingester_error, IngesterError::Cancelled);
                report.record_failure(&collection.id, ingester_error.to_string());

                if cancelled {
                    // Collections never attempted still failed this run.
                    for unscanned in &config.collections[position + 1..] {
                        report
                            .record_failure(&unscanned.id, IngesterError::Cancelled.to_string());
                    }
                    break;
                }
            }
        }
    }

    report.finalize(&table);

    Ok((table, report))
}
