mod accumulator;
mod error;
pub mod governor;
pub mod provider;

pub use accumulator::ScanCursor;
pub use error::IngesterError;
pub use provider::{Provider, ProviderError, RangeFetch};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collections::Collection;
use crate::config::Config;
use crate::holders::OwnershipCounts;

/// Scans one collection's full index space and returns its holder counts.
///
/// The scan completes when the source reports exhaustion, when
/// `empty_batch_threshold` consecutive batches yield no new tokens, or
/// when the configured upper bound is passed. It aborts on a terminal
/// source error or retry exhaustion; partial counts are discarded then,
/// never returned as ground truth.
pub async fn ingest<P: Provider + ?Sized>(
    collection: &Collection,
    provider: &P,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<OwnershipCounts, IngesterError> {
    let mut cursor = ScanCursor::new(collection.start_index);

    loop {
        if cursor.current_index > collection.max_index {
            debug!(collection = %collection.id, "reached configured upper bound");
            break;
        }

        let fetch = governor::fetch_range(
            provider,
            &collection.id,
            cursor.current_index,
            config.batch_size,
            config,
            cancel,
        )
        .await?;

        match fetch {
            RangeFetch::Exhausted => {
                debug!(collection = %collection.id, "source reported exhaustion");
                break;
            }
            RangeFetch::Records(records) => {
                let new_items = cursor.fold(&records);
                debug!(
                    collection = %collection.id,
                    start_index = cursor.current_index,
                    received = records.len(),
                    new_items,
                    "folded batch"
                );

                if cursor.consecutive_empty_batches >= config.empty_batch_threshold {
                    debug!(collection = %collection.id, "empty-batch threshold reached");
                    break;
                }
            }
        }

        cursor.advance(config.batch_size);
        governor::pace(config, cancel).await?;
    }

    info!(
        collection = %collection.id,
        records = cursor.records_seen(),
        "collection scan completed"
    );

    Ok(cursor.into_counts())
}
