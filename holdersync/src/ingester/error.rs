use derive_more::Display;

use super::provider::ProviderError;

/// Why a collection scan ended without a usable holder map.
#[derive(Debug, Display)]
pub enum IngesterError {
    #[display("source error: {_0}")]
    Source(ProviderError),
    #[display("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: ProviderError,
    },
    #[display("scan cancelled")]
    Cancelled,
}

impl std::error::Error for IngesterError {}
