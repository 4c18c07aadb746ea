use std::collections::HashMap;

use serde::Deserialize;

use crate::collections::CollectionId;

pub type OwnerId = String;

/// One on-chain item as returned by a source. Ephemeral: lives only
/// within a single fetch response before being folded into counts.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    #[serde(alias = "tokenId", alias = "id")]
    pub token_id: String,
    #[serde(alias = "ownerId", alias = "owner", alias = "owner_addr")]
    pub owner_id: String,
}

impl TokenRecord {
    pub fn new(token_id: &str, owner_id: &str) -> Self {
        Self {
            token_id: token_id.to_string(),
            owner_id: owner_id.to_string(),
        }
    }

    // Sources routinely emit rows with missing fields mid-inconsistency.
    pub fn is_valid(&self) -> bool {
        !self.token_id.is_empty() && !self.owner_id.is_empty()
    }
}

/// Owner -> count of distinct tokens, scoped to a single collection.
pub type OwnershipCounts = HashMap<OwnerId, u64>;

/// Owner -> collection -> count, across every synced collection.
/// An owner absent from a collection's map holds zero there.
pub type HolderTable = HashMap<OwnerId, HashMap<CollectionId, u64>>;

/// Folds one collection's counts into the cross-collection table.
/// Commutative across collections: merge order does not matter.
pub fn merge_into_table(
    table: &mut HolderTable,
    collection_id: &CollectionId,
    counts: OwnershipCounts,
) {
    for (owner_id, quantity) in counts {
        table.entry(owner_id).or_default().insert(collection_id.clone(), quantity);
    }
}
