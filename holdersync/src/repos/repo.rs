use derive_more::Display;

use crate::persistence::HolderUpsert;

#[derive(Debug, Display)]
pub enum RepoError {
    #[display("store unreachable: {_0}")]
    NotConnected(String),
    #[display("{_0}")]
    Unknown(String),
}

impl std::error::Error for RepoError {}

/// A persisted holder row, as read back from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HolderRow {
    pub owner_id: String,
    pub collection_id: String,
    pub quantity: i64,
}

/// The persistence sink. The Batch Persistence Writer is its only
/// writer within a run; `upsert_holders` must be idempotent on the
/// `(owner_id, collection_id)` key.
#[async_trait::async_trait]
pub trait Repo: Sync + Send {
    async fn migrate(&self) -> Result<(), RepoError>;

    /// Applies one batch of upserts. A batch either applies in full or
    /// fails in full; the writer never skips past a failed batch.
    async fn upsert_holders(&self, batch: &[HolderUpsert]) -> Result<(), RepoError>;

    async fn load_holders(&self) -> Result<Vec<HolderRow>, RepoError>;
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_holders() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS holdersync_holders (
                owner_id VARCHAR NOT NULL,
                collection_id VARCHAR NOT NULL,
                quantity BIGINT NOT NULL,
                last_synced_at TIMESTAMPTZ NOT NULL,
                synced_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (owner_id, collection_id)
        )"]
    }
}
