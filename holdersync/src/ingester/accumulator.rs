use std::collections::HashSet;

use crate::holders::{OwnershipCounts, TokenRecord};

/// Progress state for one collection scan. Created when the scan starts,
/// consumed when it completes; never shared across collections.
pub struct ScanCursor {
    pub current_index: u64,
    pub consecutive_empty_batches: u32,
    seen_token_ids: HashSet<String>,
    counts: OwnershipCounts,
}

impl ScanCursor {
    pub fn new(start_index: u64) -> Self {
        Self {
            current_index: start_index,
            consecutive_empty_batches: 0,
            seen_token_ids: HashSet::new(),
            counts: OwnershipCounts::new(),
        }
    }

    pub fn is_duplicate(&self, token_id: &str) -> bool {
        self.seen_token_ids.contains(token_id)
    }

    /// Folds a batch into the counts, skipping already-seen token ids so
    /// retried or overlapping ranges never double count. Returns how many
    /// records were new; a batch with zero new records bumps the
    /// consecutive-empty counter, anything else resets it.
    pub fn fold(&mut self, records: &[TokenRecord]) -> usize {
        let mut new_items = 0;

        for record in records {
            if self.is_duplicate(&record.token_id) {
                continue;
            }
            self.seen_token_ids.insert(record.token_id.clone());
            *self.counts.entry(record.owner_id.clone()).or_insert(0) += 1;
            new_items += 1;
        }

        if new_items == 0 {
            self.consecutive_empty_batches += 1;
        } else {
            self.consecutive_empty_batches = 0;
        }

        new_items
    }

    pub fn advance(&mut self, batch_size: u64) {
        self.current_index += batch_size;
    }

    pub fn records_seen(&self) -> usize {
        self.seen_token_ids.len()
    }

    pub fn into_counts(self) -> OwnershipCounts {
        self.counts
    }
}
