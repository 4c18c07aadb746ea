use std::collections::BTreeMap;
use std::sync::Mutex;

use holdersync::{HolderRow, HolderUpsert, Repo, RepoError};

/// In-memory sink with the same `(owner_id, collection_id)` upsert key
/// as the Postgres repo. Optionally rejects batches from a given batch
/// index onwards, for partial-failure tests.
pub struct MemoryRepo {
    rows: Mutex<BTreeMap<(String, String), i64>>,
    batches_seen: Mutex<usize>,
    fail_from_batch: Option<usize>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            batches_seen: Mutex::new(0),
            fail_from_batch: None,
        }
    }

    pub fn failing_from_batch(fail_from_batch: usize) -> Self {
        Self {
            fail_from_batch: Some(fail_from_batch),
            ..Self::new()
        }
    }

    pub fn batches_seen(&self) -> usize {
        *self.batches_seen.lock().unwrap()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Repo for MemoryRepo {
    async fn migrate(&self) -> Result<(), RepoError> {
        Ok(())
    }

    async fn upsert_holders(&self, batch: &[HolderUpsert]) -> Result<(), RepoError> {
        let batch_index = {
            let mut batches_seen = self.batches_seen.lock().unwrap();
            let batch_index = *batches_seen;
            *batches_seen += 1;
            batch_index
        };

        if let Some(fail_from_batch) = self.fail_from_batch {
            if batch_index >= fail_from_batch {
                return Err(RepoError::Unknown(format!("batch {batch_index} rejected")));
            }
        }

        let mut rows = self.rows.lock().unwrap();
        for upsert in batch {
            rows.insert(
                (upsert.owner_id.clone(), upsert.collection_id.clone()),
                upsert.quantity,
            );
        }

        Ok(())
    }

    async fn load_holders(&self) -> Result<Vec<HolderRow>, RepoError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|((owner_id, collection_id), quantity)| HolderRow {
                owner_id: owner_id.clone(),
                collection_id: collection_id.clone(),
                quantity: *quantity,
            })
            .collect())
    }
}
