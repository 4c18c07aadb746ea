use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::IngesterError;
use super::provider::{Provider, ProviderError, RangeFetch};
use crate::collections::CollectionId;
use crate::config::Config;

/// Fetches one range through the retry policy.
///
/// Rate-limit failures get a single longer flat backoff; other transient
/// failures get capped exponential backoff, bounded by `max_retries`.
/// The same range is retried every time; ranges are never skipped.
/// Terminal errors propagate immediately.
pub async fn fetch_range<P: Provider + ?Sized>(
    provider: &P,
    collection: &CollectionId,
    start_index: u64,
    batch_size: u64,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<RangeFetch, IngesterError> {
    let mut attempts = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(IngesterError::Cancelled);
        }

        let call = provider.fetch_range(collection, start_index, batch_size);
        let outcome = match timeout(Duration::from_millis(config.request_timeout_ms), call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Timeout),
        };

        match outcome {
            Ok(fetch) => return Ok(fetch),
            Err(error) if !error.is_transient() => return Err(IngesterError::Source(error)),
            Err(error) => {
                attempts += 1;
                if attempts > config.max_retries {
                    return Err(IngesterError::RetriesExhausted {
                        attempts,
                        last_error: error,
                    });
                }

                let delay = if error.is_rate_limited() {
                    Duration::from_millis(config.rate_limit_backoff_ms)
                } else {
                    backoff(config.retry_backoff_ms, attempts)
                };
                warn!(
                    collection = %collection,
                    start_index,
                    attempt = attempts,
                    error = %error,
                    "range fetch failed; retrying"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(IngesterError::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}

/// Inter-call pacing delay mandated towards the shared source.
pub async fn pace(config: &Config, cancel: &CancellationToken) -> Result<(), IngesterError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(IngesterError::Cancelled),
        _ = sleep(Duration::from_millis(config.fetch_rate_ms)) => Ok(()),
    }
}

fn backoff(base_ms: u64, attempts: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempts.saturating_sub(1))))
}
