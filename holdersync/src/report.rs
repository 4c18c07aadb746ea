use std::collections::BTreeMap;

use serde::Serialize;

use crate::collections::CollectionId;
use crate::holders::{HolderTable, OwnershipCounts};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub holders: usize,
    pub records: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedCollection {
    pub collection_id: String,
    pub reason: String,
}

/// Result of one full sync run. Immutable once the run ends.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SyncReport {
    pub total_owners: usize,
    pub total_records: u64,
    pub collections: BTreeMap<String, CollectionSummary>,
    pub failed: Vec<FailedCollection>,
}

impl SyncReport {
    pub(crate) fn record_success(&mut self, collection_id: &CollectionId, counts: &OwnershipCounts) {
        let records = counts.values().sum::<u64>();
        self.total_records += records;
        self.collections.insert(
            collection_id.to_string(),
            CollectionSummary {
                holders: counts.len(),
                records,
            },
        );
    }

    pub(crate) fn record_failure(&mut self, collection_id: &CollectionId, reason: String) {
        self.failed.push(FailedCollection {
            collection_id: collection_id.to_string(),
            reason,
        });
    }

    pub(crate) fn finalize(&mut self, table: &HolderTable) {
        self.total_owners = table.len();
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.collections.is_empty() && !self.failed.is_empty()
    }
}

impl std::fmt::Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "holder sync summary")?;
        writeln!(f, "  unique owners: {}", self.total_owners)?;
        writeln!(f, "  ownership records: {}", self.total_records)?;
        for (collection_id, summary) in &self.collections {
            writeln!(
                f,
                "  {}: {} holders, {} records",
                collection_id, summary.holders, summary.records
            )?;
        }
        for failure in &self.failed {
            writeln!(f, "  FAILED {}: {}", failure.collection_id, failure.reason)?;
        }

        Ok(())
    }
}
