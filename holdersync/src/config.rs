use std::env;

use crate::collections::Collection;

pub enum ConfigError {
    NoCollections,
    ZeroBatchSize,
    ZeroPersistBatchSize,
    ZeroMaxIndex(String),
    MissingRemoteDatabaseUrl,
}

impl std::fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoCollections => {
                write!(f, "At least one collection is required")
            }
            ConfigError::ZeroBatchSize => {
                write!(f, "batch_size must be greater than zero")
            }
            ConfigError::ZeroPersistBatchSize => {
                write!(f, "persist_batch_size must be greater than zero")
            }
            ConfigError::ZeroMaxIndex(collection_id) => {
                write!(f, "max_index for collection {} must be greater than zero", collection_id)
            }
            ConfigError::MissingRemoteDatabaseUrl => {
                write!(f, "HOLDERSYNC_REMOTE_DATABASE_URL env variable needs to be set.")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub collections: Vec<Collection>,
    /// Tokens requested per range query. A knob, never derived from
    /// response sizes.
    pub batch_size: u64,
    /// Inter-call pacing delay between range fetches.
    pub fetch_rate_ms: u64,
    /// The single longer delay applied when the source rate-limits us.
    pub rate_limit_backoff_ms: u64,
    /// Base delay for exponential backoff on other transient failures.
    pub retry_backoff_ms: u64,
    pub max_retries: u32,
    pub request_timeout_ms: u64,
    /// Consecutive no-new-token batches after which a scan completes.
    pub empty_batch_threshold: u32,
    /// Upsert tuples applied to the store per batch.
    pub persist_batch_size: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            collections: vec![],
            batch_size: 30,
            fetch_rate_ms: 500,
            rate_limit_backoff_ms: 10_000,
            retry_backoff_ms: 1_000,
            max_retries: 5,
            request_timeout_ms: 15_000,
            empty_batch_threshold: 10,
            persist_batch_size: 50,
        }
    }

    pub fn add_collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);

        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;

        self
    }

    pub fn with_fetch_rate_ms(mut self, fetch_rate_ms: u64) -> Self {
        self.fetch_rate_ms = fetch_rate_ms;

        self
    }

    pub fn with_rate_limit_backoff_ms(mut self, rate_limit_backoff_ms: u64) -> Self {
        self.rate_limit_backoff_ms = rate_limit_backoff_ms;

        self
    }

    pub fn with_retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.retry_backoff_ms = retry_backoff_ms;

        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;

        self
    }

    pub fn with_request_timeout_ms(mut self, request_timeout_ms: u64) -> Self {
        self.request_timeout_ms = request_timeout_ms;

        self
    }

    pub fn with_empty_batch_threshold(mut self, empty_batch_threshold: u32) -> Self {
        self.empty_batch_threshold = empty_batch_threshold;

        self
    }

    pub fn with_persist_batch_size(mut self, persist_batch_size: usize) -> Self {
        self.persist_batch_size = persist_batch_size;

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collections.is_empty() {
            return Err(ConfigError::NoCollections);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.persist_batch_size == 0 {
            return Err(ConfigError::ZeroPersistBatchSize);
        }
        for collection in &self.collections {
            if collection.max_index == 0 {
                return Err(ConfigError::ZeroMaxIndex(collection.id.to_string()));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the store URL for this run. `remote` targets the production
/// store and requires an explicit URL; the local default needs none.
pub fn database_url(remote: bool) -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();

    if remote {
        env::var("HOLDERSYNC_REMOTE_DATABASE_URL")
            .map_err(|_| ConfigError::MissingRemoteDatabaseUrl)
    } else {
        Ok(env::var("HOLDERSYNC_DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost:5432/holdersync".to_string()))
    }
}
