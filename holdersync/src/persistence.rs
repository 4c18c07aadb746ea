use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::info;

use crate::holders::HolderTable;
use crate::repos::{Repo, RepoError};

/// One idempotent upsert tuple, keyed by `(owner_id, collection_id)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HolderUpsert {
    pub owner_id: String,
    pub collection_id: String,
    pub quantity: i64,
    pub last_synced_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

/// Outcome of a fully applied run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistOutcome {
    pub tuples: usize,
    pub batches_total: usize,
    pub batches_applied: usize,
}

/// The writer stopped at the first failing batch. Already-applied
/// batches stay applied; there is no rollback.
#[derive(Debug, Display)]
#[display("persistence failed after {batches_applied} of {batches_total} batches: {source}")]
pub struct PersistError {
    pub batches_applied: usize,
    pub batches_total: usize,
    pub source: RepoError,
}

impl std::error::Error for PersistError {}

/// Flattens the cross-collection table into upsert tuples, in a
/// deterministic order. This is the whole of dry-run mode: callers that
/// stop here never touch the store.
pub fn flatten(table: &HolderTable, synced_at: DateTime<Utc>) -> Vec<HolderUpsert> {
    let mut upserts: Vec<_> = table
        .iter()
        .flat_map(|(owner_id, per_collection)| {
            per_collection.iter().map(move |(collection_id, quantity)| HolderUpsert {
                owner_id: owner_id.clone(),
                collection_id: collection_id.to_string(),
                quantity: *quantity as i64,
                last_synced_at: synced_at,
                synced_at,
            })
        })
        .collect();

    upserts.sort_by(|a, b| {
        (&a.owner_id, &a.collection_id).cmp(&(&b.owner_id, &b.collection_id))
    });

    upserts
}

/// The commit gate behind the binary's `--apply` flag. Without a sink
/// this is a preview: batch counts are computed but nothing is written.
pub async fn commit<R: Repo + ?Sized>(
    sink: Option<&R>,
    upserts: &[HolderUpsert],
    batch_size: usize,
) -> Result<PersistOutcome, PersistError> {
    match sink {
        Some(repo) => persist(repo, upserts, batch_size).await,
        None => {
            let batches_total = upserts.chunks(batch_size.max(1)).count();
            Ok(PersistOutcome {
                tuples: upserts.len(),
                batches_total,
                batches_applied: 0,
            })
        }
    }
}

/// Applies the tuples in fixed-size batches. Stops at the first failing
/// batch rather than skipping ahead, and reports how far it got.
pub async fn persist<R: Repo + ?Sized>(
    repo: &R,
    upserts: &[HolderUpsert],
    batch_size: usize,
) -> Result<PersistOutcome, PersistError> {
    let batches: Vec<&[HolderUpsert]> = upserts.chunks(batch_size.max(1)).collect();
    let batches_total = batches.len();

    for (applied, batch) in batches.iter().enumerate() {
        if let Err(source) = repo.upsert_holders(batch).await {
            return Err(PersistError {
                batches_applied: applied,
                batches_total,
                source,
            });
        }
    }

    info!(tuples = upserts.len(), batches = batches_total, "holder table persisted");

    Ok(PersistOutcome {
        tuples: upserts.len(),
        batches_total,
        batches_applied: batches_total,
    })
}
