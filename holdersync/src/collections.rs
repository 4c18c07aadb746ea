use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies one NFT contract/collection whose ownership is being synced.
/// Opaque to the pipeline; comes from configuration.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(String);

impl CollectionId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One collection to sync, with its index-space bounds.
///
/// `max_index` must come from configuration: the source's token index
/// ordering is not guaranteed contiguous or bounded by collection size,
/// so a scan cannot infer its own upper bound.
///
/// # Example
/// ```
/// use holdersync::Collection;
///
/// Collection::new("stars1punks...", 10_000).with_start_index(1);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub max_index: u64,
    #[serde(default)]
    pub start_index: u64,
}

impl Collection {
    pub fn new(id: &str, max_index: u64) -> Self {
        Self {
            id: CollectionId::new(id),
            max_index,
            start_index: 0,
        }
    }

    pub fn with_start_index(mut self, start_index: u64) -> Self {
        self.start_index = start_index;

        self
    }
}
